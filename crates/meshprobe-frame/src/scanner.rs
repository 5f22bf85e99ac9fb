use bytes::BytesMut;
use tracing::debug;

use crate::codec::{decode_frame, Frame, DEFAULT_MAX_PAYLOAD, PREAMBLE};
use crate::error::FrameError;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reassembles plaintext frames from arbitrarily split chunks.
///
/// Chunks are pushed as they arrive; complete frames come back in order.
/// Bytes that cannot start a frame are dropped up to the next preamble and
/// counted in [`FrameScanner::skipped`].
pub struct FrameScanner {
    buf: BytesMut,
    max_payload_size: usize,
    skipped: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload_size,
            skipped: 0,
        }
    }

    /// Append a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match decode_frame(&mut self.buf, self.max_payload_size) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(err) => self.resync(&err),
            }
        }
        frames
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes discarded while out of sync.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn resync(&mut self, err: &FrameError) {
        let drop_len = self.buf[1..]
            .iter()
            .position(|&b| b == PREAMBLE)
            .map_or(self.buf.len(), |pos| pos + 1);
        debug!(error = %err, dropped = drop_len, "frame stream out of sync");
        let _ = self.buf.split_to(drop_len);
        self.skipped += drop_len;
    }
}
