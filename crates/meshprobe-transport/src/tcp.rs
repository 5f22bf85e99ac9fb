use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::{Received, Transport};

/// Longest single blocking read before the cancel token is checked again.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Largest buffer a single `receive` allocates; larger requests are clamped.
pub const MAX_RECV_BUFFER_SIZE: usize = 1024 * 1024;

/// Lifecycle of a [`TcpConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

/// TCP client connection with a per-operation timeout.
///
/// Every `receive` waits at most `timeout`. The wait is split into
/// `poll_interval` slices so an interrupt is seen while blocked.
pub struct TcpConnection {
    stream: Option<TcpStream>,
    endpoint: Endpoint,
    peer_addr: Option<SocketAddr>,
    timeout: Duration,
    poll_interval: Duration,
    state: ConnectionState,
}

impl TcpConnection {
    /// Connect to `endpoint`, bounding the connect and later I/O by `timeout`.
    ///
    /// Each resolved address is tried in turn; the last failure is reported.
    pub fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(TransportError::Connect {
                endpoint: endpoint.clone(),
                source: std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "connect timeout must be greater than zero",
                ),
            });
        }

        let addrs: Vec<SocketAddr> = (endpoint.host(), endpoint.port())
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve {
                endpoint: endpoint.clone(),
                source: e,
            })?
            .collect();

        let mut last_err = std::io::Error::new(
            ErrorKind::AddrNotAvailable,
            "endpoint resolved to no addresses",
        );

        for addr in addrs {
            debug!(%addr, ?timeout, "connecting");
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(Some(timeout))?;
                    debug!(%addr, "connected");
                    return Ok(Self {
                        stream: Some(stream),
                        endpoint: endpoint.clone(),
                        peer_addr: Some(addr),
                        timeout,
                        poll_interval: DEFAULT_POLL_INTERVAL,
                        state: ConnectionState::Connected,
                    });
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }

        Err(TransportError::Connect {
            endpoint: endpoint.clone(),
            source: last_err,
        })
    }

    /// Override the cancellation poll slice. Zero is clamped to one millisecond.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The resolved address the connection was made to.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for TcpConnection {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;

        let mut offset = 0usize;
        while offset < data.len() {
            match stream.write(&data[offset..]) {
                Ok(0) => {
                    return Err(TransportError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        format!("wrote {offset} of {} bytes", data.len()),
                    )))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match stream.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        trace!(size = data.len(), "sent");
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize, cancel: &CancelToken) -> Result<Received> {
        let timeout = self.timeout;
        let poll_interval = self.poll_interval;
        let stream = self.stream_mut()?;

        let mut buf = vec![0u8; max_bytes.clamp(1, MAX_RECV_BUFFER_SIZE)];
        let deadline = Instant::now() + timeout;

        loop {
            if cancel.is_cancelled() {
                return Ok(Received::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(?timeout, "receive timed out");
                return Ok(Received::Timeout);
            }
            stream.set_read_timeout(Some(poll_interval.min(deadline - now)))?;

            match stream.read(&mut buf) {
                Ok(0) => {
                    debug!("remote closed the connection");
                    return Ok(Received::Closed);
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Received::Data(Bytes::from(buf)));
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; shutdown errors carry no information here.
            let _ = stream.shutdown(Shutdown::Both);
            debug!(endpoint = %self.endpoint, "connection closed");
        }
        self.state = ConnectionState::Closed;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("endpoint", &self.endpoint)
            .field("peer_addr", &self.peer_addr)
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .finish()
    }
}
