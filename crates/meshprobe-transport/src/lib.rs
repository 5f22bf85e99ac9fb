//! Bounded-timeout TCP connection management.
//!
//! This is the lowest layer of meshprobe. It owns the socket and exposes:
//! - [`TcpConnection`], a connected stream with a per-call receive deadline
//! - [`Received`], the tagged outcome of a receive (data, timeout, close, cancel)
//! - [`CancelToken`], the interrupt flag observed while blocked on a receive
//!
//! Everything else builds on the [`Transport`] trait provided here.

pub mod cancel;
pub mod endpoint;
pub mod error;
pub mod tcp;
pub mod traits;

pub use cancel::CancelToken;
pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use tcp::{ConnectionState, TcpConnection, DEFAULT_POLL_INTERVAL, MAX_RECV_BUFFER_SIZE};
pub use traits::{Received, Transport};
