/// Errors that end a session abnormally.
///
/// Handshake rejection, timeouts and interrupts are not errors; they are
/// reported through [`crate::Termination`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error, including connect failures.
    #[error("transport error: {0}")]
    Transport(#[from] meshprobe_transport::TransportError),

    /// Remote closed the connection during a phase that requires a reply.
    #[error("peer disconnected: {0}")]
    Disconnected(String),
}

impl SessionError {
    /// Whether the session never got past establishing the connection.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(
                meshprobe_transport::TransportError::Connect { .. }
                    | meshprobe_transport::TransportError::Resolve { .. }
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
