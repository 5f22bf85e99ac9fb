use std::fmt;
use std::io;

use meshprobe_frame::FrameError;
use meshprobe_session::SessionError;
use meshprobe_transport::TransportError;

// Normal terminations (rejection, timeout, interrupt) all exit with SUCCESS.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => FAILURE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { endpoint, source } => {
            io_error(&format!("{context}: {endpoint}"), source)
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::Resolve { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        TransportError::Closed => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::InvalidHex(_) => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Disconnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use meshprobe_transport::Endpoint;

    use super::*;

    #[test]
    fn connect_refused_is_failure() {
        let err = session_error(
            "probe failed",
            SessionError::Transport(TransportError::Connect {
                endpoint: Endpoint::default(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("127.0.0.1:6053"));
    }

    #[test]
    fn connect_timeout_maps_to_124() {
        let err = transport_error(
            "probe failed",
            TransportError::Connect {
                endpoint: Endpoint::default(),
                source: io::Error::from(io::ErrorKind::TimedOut),
            },
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn bad_frame_hex_is_usage() {
        let err = frame_error("--frame", FrameError::InvalidHex("odd".to_string()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn disconnect_during_handshake_is_failure() {
        let err = session_error(
            "probe failed",
            SessionError::Disconnected("closed".to_string()),
        );
        assert_eq!(err.code, FAILURE);
    }
}
