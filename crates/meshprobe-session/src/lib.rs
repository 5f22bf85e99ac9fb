//! Handshake-gated session driver.
//!
//! This is the "just works" layer. Connect to the proxy, send the `INIT`
//! line, and if the acknowledgment matches exactly, send one frame and
//! forward every received chunk to a [`ChunkSink`] until the stream goes
//! quiet, closes, or is interrupted.

pub mod connector;
pub mod error;
pub mod handshake;
pub mod session;
pub mod sink;

pub use connector::probe;
pub use error::{Result, SessionError};
pub use handshake::{
    node_identifier, perform_handshake, HandshakeConfig, HandshakeOutcome, HandshakeRequest,
    DEFAULT_IDENTIFIER, HANDSHAKE_ACK,
};
pub use session::{
    Session, SessionConfig, SessionReport, SessionState, Termination, DEFAULT_PACING_DELAY,
    DEFAULT_RECV_BUFFER_SIZE,
};
pub use sink::{ChunkSink, CollectingSink};
