use bytes::Bytes;

use crate::cancel::CancelToken;
use crate::error::Result;

/// Outcome of a single bounded receive.
///
/// Timeout, remote close and cancellation are ordinary outcomes rather than
/// errors; callers decide which of them end their current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// At least one byte arrived before the deadline.
    Data(Bytes),
    /// Nothing arrived before the deadline.
    Timeout,
    /// The remote side closed the stream (zero-length read).
    Closed,
    /// The cancel token was set while waiting.
    Cancelled,
}

/// A connected byte stream with bounded blocking operations.
///
/// Implemented by [`crate::TcpConnection`]; the session layer is generic over
/// it so alternate streams can stand in for a socket.
pub trait Transport {
    /// Write all of `data`. A write is never abandoned part way through.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for up to `max_bytes` within the connection timeout.
    fn receive(&mut self, max_bytes: usize, cancel: &CancelToken) -> Result<Received>;

    /// Release the underlying stream. Calling it again is a no-op.
    fn close(&mut self);

    /// Whether the stream is still usable.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn receive(&mut self, max_bytes: usize, cancel: &CancelToken) -> Result<Received> {
        (**self).receive(max_bytes, cancel)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
