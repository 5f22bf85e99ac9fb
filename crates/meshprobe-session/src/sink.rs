use bytes::Bytes;

/// Display collaborator for received chunks.
///
/// The session hands over every chunk exactly as read, in arrival order.
pub trait ChunkSink {
    fn on_chunk(&mut self, chunk: &Bytes);
}

impl<F: FnMut(&Bytes)> ChunkSink for F {
    fn on_chunk(&mut self, chunk: &Bytes) {
        self(chunk)
    }
}

/// Sink that keeps every chunk in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub chunks: Vec<Bytes>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chunks concatenated in arrival order.
    pub fn concat(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

impl ChunkSink for CollectingSink {
    fn on_chunk(&mut self, chunk: &Bytes) {
        self.chunks.push(chunk.clone());
    }
}
