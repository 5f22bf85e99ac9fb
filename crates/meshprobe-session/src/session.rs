use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use meshprobe_frame::{to_hex, DEFAULT_HELLO_FRAME};
use meshprobe_transport::{CancelToken, Received, Transport};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::handshake::{await_acknowledgment, send_request, HandshakeConfig, HandshakeOutcome};
use crate::sink::ChunkSink;

/// Wait between acknowledgment and first frame; the proxy is still opening
/// the mesh path when it acknowledges.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(500);

/// Bytes requested per streaming receive.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4096;

/// Protocol session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    AwaitingHandshake,
    HandshakeOk,
    HandshakeFailed,
    Streaming,
    Terminated,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Reply to `INIT` was not the expected acknowledgment.
    HandshakeRejected,
    /// No reply to `INIT` within the timeout.
    HandshakeTimedOut,
    /// Streaming read went quiet for a full timeout.
    StreamTimedOut,
    /// Remote closed the stream after streaming started.
    RemoteClosed,
    /// Interrupted by the user.
    Cancelled,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::HandshakeRejected => "handshake_rejected",
            Termination::HandshakeTimedOut => "handshake_timed_out",
            Termination::StreamTimedOut => "stream_timed_out",
            Termination::RemoteClosed => "remote_closed",
            Termination::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a session needs besides the stream itself.
#[derive(Clone)]
pub struct SessionConfig {
    pub handshake: HandshakeConfig,
    /// Bytes written once after the acknowledgment, verbatim.
    pub frame: Bytes,
    pub pacing_delay: Duration,
    pub recv_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake: HandshakeConfig::default(),
            frame: Bytes::from_static(DEFAULT_HELLO_FRAME),
            pacing_delay: DEFAULT_PACING_DELAY,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("handshake", &self.handshake)
            .field("frame", &to_hex(&self.frame))
            .field("pacing_delay", &self.pacing_delay)
            .field("recv_buffer_size", &self.recv_buffer_size)
            .finish()
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub final_state: SessionState,
    pub termination: Termination,
    pub frame_sent: bool,
    pub chunks_received: usize,
    pub bytes_received: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_reply_hex: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Default)]
struct Progress {
    frame_sent: bool,
    chunks_received: usize,
    bytes_received: usize,
    handshake_reply: Option<Bytes>,
}

/// One handshake-gated exchange over an exclusively owned stream.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Drive the session to `Terminated`.
    ///
    /// The stream is closed exactly once before this returns, whichever way
    /// the session ends.
    pub fn run<S: ChunkSink + ?Sized>(
        mut self,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<SessionReport> {
        let started = Instant::now();
        let mut progress = Progress::default();

        let result = self.drive(sink, cancel, &mut progress);

        self.transport.close();
        self.transition(SessionState::Terminated);

        let termination = match result {
            Ok(termination) => termination,
            Err(err) => {
                warn!(error = %err, "session failed");
                return Err(err);
            }
        };

        let report = SessionReport {
            final_state: self.state,
            termination,
            frame_sent: progress.frame_sent,
            chunks_received: progress.chunks_received,
            bytes_received: progress.bytes_received,
            handshake_reply_hex: progress.handshake_reply.as_deref().map(to_hex),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            termination = %report.termination,
            chunks = report.chunks_received,
            bytes = report.bytes_received,
            "session finished"
        );
        Ok(report)
    }

    fn drive<S: ChunkSink + ?Sized>(
        &mut self,
        sink: &mut S,
        cancel: &CancelToken,
        progress: &mut Progress,
    ) -> Result<Termination> {
        // An interrupt that arrived while connecting ends the session before INIT.
        if cancel.is_cancelled() {
            return Ok(Termination::Cancelled);
        }

        send_request(&mut self.transport, &self.config.handshake.request())?;
        self.transition(SessionState::AwaitingHandshake);

        match await_acknowledgment(&mut self.transport, &self.config.handshake, cancel)? {
            HandshakeOutcome::Accepted => {
                progress.handshake_reply = Some(self.config.handshake.expected_ack.clone());
                self.transition(SessionState::HandshakeOk);
                info!("handshake accepted");
            }
            HandshakeOutcome::Rejected(reply) => {
                progress.handshake_reply = Some(reply);
                self.transition(SessionState::HandshakeFailed);
                return Ok(Termination::HandshakeRejected);
            }
            HandshakeOutcome::TimedOut => {
                self.transition(SessionState::HandshakeFailed);
                return Ok(Termination::HandshakeTimedOut);
            }
            HandshakeOutcome::Cancelled => return Ok(Termination::Cancelled),
        }

        if !cancel.sleep(self.config.pacing_delay) {
            debug!("cancelled during pacing delay");
            return Ok(Termination::Cancelled);
        }

        self.transition(SessionState::Streaming);
        self.transport.send(&self.config.frame)?;
        progress.frame_sent = true;
        debug!(size = self.config.frame.len(), "frame sent");

        loop {
            match self
                .transport
                .receive(self.config.recv_buffer_size, cancel)?
            {
                Received::Data(chunk) => {
                    progress.chunks_received += 1;
                    progress.bytes_received += chunk.len();
                    trace!(size = chunk.len(), hex = %to_hex(&chunk), "chunk received");
                    sink.on_chunk(&chunk);
                }
                Received::Timeout => return Ok(Termination::StreamTimedOut),
                Received::Closed => return Ok(Termination::RemoteClosed),
                Received::Cancelled => return Ok(Termination::Cancelled),
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
