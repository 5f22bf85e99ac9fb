use std::fmt;

use bytes::Bytes;
use meshprobe_frame::to_hex;
use meshprobe_transport::{CancelToken, Received, Transport, DEFAULT_PORT};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Acknowledgment the proxy sends once it has opened the mesh path.
pub const HANDSHAKE_ACK: &[u8] = b"!!OK!";

/// Identifier of node `0x1C8768`, the node used by the reference run.
pub const DEFAULT_IDENTIFIER: &str = "0.28.135.104";

const DEFAULT_MAX_REPLY_SIZE: usize = 4096;

/// The `INIT` line sent before any binary traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Opaque target identifier, passed through verbatim.
    pub identifier: String,
    /// Port announced to the proxy.
    pub port: u16,
}

impl HandshakeRequest {
    pub fn new(identifier: impl Into<String>, port: u16) -> Self {
        Self {
            identifier: identifier.into(),
            port,
        }
    }

    /// Wire form: `INIT|<identifier>|<port>\n`.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("INIT|{}|{}\n", self.identifier, self.port))
    }
}

/// Configuration for the handshake exchange.
#[derive(Clone)]
pub struct HandshakeConfig {
    /// Identifier placed in the `INIT` line.
    pub identifier: String,
    /// Port placed in the `INIT` line.
    pub announce_port: u16,
    /// Exact reply required before any frame is sent.
    pub expected_ack: Bytes,
    /// Largest reply read in the single acknowledgment receive.
    pub max_reply_size: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            announce_port: DEFAULT_PORT,
            expected_ack: Bytes::from_static(HANDSHAKE_ACK),
            max_reply_size: DEFAULT_MAX_REPLY_SIZE,
        }
    }
}

impl HandshakeConfig {
    pub fn request(&self) -> HandshakeRequest {
        HandshakeRequest::new(self.identifier.clone(), self.announce_port)
    }
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("identifier", &self.identifier)
            .field("announce_port", &self.announce_port)
            .field(
                "expected_ack",
                &String::from_utf8_lossy(&self.expected_ack),
            )
            .field("max_reply_size", &self.max_reply_size)
            .finish()
    }
}

/// How the acknowledgment wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Reply matched the expected acknowledgment exactly.
    Accepted,
    /// Reply arrived but differed in any byte or in length.
    Rejected(Bytes),
    /// Nothing arrived within the connection timeout.
    TimedOut,
    /// Interrupted while waiting.
    Cancelled,
}

impl HandshakeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, HandshakeOutcome::Accepted)
    }
}

/// Format a 24-bit mesh node id as the proxy's dotted identifier.
///
/// `0x1C8768` becomes `0.28.135.104`.
pub fn node_identifier(node_id: u32) -> String {
    format!(
        "0.{}.{}.{}",
        (node_id >> 16) & 0xff,
        (node_id >> 8) & 0xff,
        node_id & 0xff
    )
}

/// Send the `INIT` line.
pub fn send_request<T: Transport + ?Sized>(
    transport: &mut T,
    request: &HandshakeRequest,
) -> Result<()> {
    debug!(identifier = %request.identifier, port = request.port, "sending handshake");
    transport.send(&request.encode())?;
    Ok(())
}

/// Perform one bounded receive and compare it with the expected acknowledgment.
///
/// Only byte-for-byte equality is accepted; a reply that merely starts with
/// the acknowledgment is rejected. A remote close is an error because the
/// proxy owes a reply.
pub fn await_acknowledgment<T: Transport + ?Sized>(
    transport: &mut T,
    config: &HandshakeConfig,
    cancel: &CancelToken,
) -> Result<HandshakeOutcome> {
    match transport.receive(config.max_reply_size, cancel)? {
        Received::Data(reply) if reply == config.expected_ack => Ok(HandshakeOutcome::Accepted),
        Received::Data(reply) => {
            warn!(
                reply = %String::from_utf8_lossy(&reply),
                reply_hex = %to_hex(&reply),
                "handshake rejected"
            );
            Ok(HandshakeOutcome::Rejected(reply))
        }
        Received::Timeout => {
            warn!("handshake timed out");
            Ok(HandshakeOutcome::TimedOut)
        }
        Received::Cancelled => Ok(HandshakeOutcome::Cancelled),
        Received::Closed => Err(SessionError::Disconnected(
            "remote closed before handshake acknowledgment".to_string(),
        )),
    }
}

/// Run the complete handshake exchange.
pub fn perform_handshake<T: Transport + ?Sized>(
    transport: &mut T,
    config: &HandshakeConfig,
    cancel: &CancelToken,
) -> Result<HandshakeOutcome> {
    send_request(transport, &config.request())?;
    await_acknowledgment(transport, config, cancel)
}
