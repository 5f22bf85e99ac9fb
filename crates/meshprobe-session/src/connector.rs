use std::time::Duration;

use meshprobe_transport::{CancelToken, Endpoint, TcpConnection};
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig, SessionReport};
use crate::sink::ChunkSink;

/// Connect to `endpoint` and run one session over the new connection.
///
/// `timeout` bounds the connect and every later send and receive. A connect
/// failure is returned before any handshake byte is written.
pub fn probe<S: ChunkSink + ?Sized>(
    endpoint: &Endpoint,
    timeout: Duration,
    config: SessionConfig,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<SessionReport> {
    let connection = TcpConnection::connect(endpoint, timeout)?;
    info!(%endpoint, "connected");
    Session::new(connection, config).run(sink, cancel)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Instant;

    use bytes::Bytes;
    use meshprobe_frame::to_hex;

    use super::*;
    use crate::error::SessionError;
    use crate::handshake::HANDSHAKE_ACK;
    use crate::session::Termination;
    use crate::sink::CollectingSink;

    const INIT_LINE: &[u8] = b"INIT|0.28.135.104|6053\n";
    const HELLO_FRAME_HEX: &str = "0013010a0d61696f657370686f6d6561706910011807";

    fn local_listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener
            .local_addr()
            .expect("listener should have an address")
            .port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    fn read_init(stream: &mut TcpStream) {
        let mut line = vec![0u8; INIT_LINE.len()];
        stream.read_exact(&mut line).expect("server should read INIT");
        assert_eq!(line, INIT_LINE);
    }

    fn config(pacing_delay: Duration) -> SessionConfig {
        SessionConfig {
            pacing_delay,
            ..SessionConfig::default()
        }
    }

    /// Server side reports whether anything arrived after the INIT line.
    fn bytes_after_init(stream: &mut TcpStream) -> Vec<u8> {
        stream
            .set_read_timeout(Some(Duration::from_secs(3)))
            .expect("server should set read timeout");
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        rest
    }

    #[test]
    fn accepted_handshake_sends_hello_and_streams_until_quiet() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            read_init(&mut stream);
            let acked_at = Instant::now();
            stream.write_all(HANDSHAKE_ACK).expect("server should ack");

            let mut frame = vec![0u8; HELLO_FRAME_HEX.len() / 2];
            stream.read_exact(&mut frame).expect("server should read frame");
            let waited = acked_at.elapsed();

            stream
                .write_all(b"\x00\x02\x02hi")
                .expect("server should write response");
            thread::sleep(Duration::from_millis(50));
            stream
                .write_all(b"\x00\x00\x08")
                .expect("server should write pong");
            (to_hex(&frame), waited, stream)
        });

        let mut sink = CollectingSink::new();
        let report = probe(
            &endpoint,
            Duration::from_millis(400),
            config(Duration::from_millis(200)),
            &mut sink,
            &CancelToken::new(),
        )
        .expect("probe should finish normally");

        let (frame_hex, waited, _stream) = server.join().expect("server thread should complete");
        assert_eq!(frame_hex, HELLO_FRAME_HEX);
        assert!(waited >= Duration::from_millis(200), "pacing delay honored");

        assert_eq!(report.termination, Termination::StreamTimedOut);
        assert!(report.frame_sent);
        assert_eq!(sink.concat(), b"\x00\x02\x02hi\x00\x00\x08");
    }

    #[test]
    fn rejected_handshake_sends_nothing_more_and_closes() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            read_init(&mut stream);
            stream.write_all(b"NOPE!").expect("server should reply");
            bytes_after_init(&mut stream)
        });

        let mut sink = CollectingSink::new();
        let report = probe(
            &endpoint,
            Duration::from_secs(2),
            config(Duration::from_millis(10)),
            &mut sink,
            &CancelToken::new(),
        )
        .expect("rejection is a normal termination");

        assert_eq!(report.termination, Termination::HandshakeRejected);
        assert!(!report.frame_sent);

        // read_to_end returning means the client closed its side.
        let trailing = server.join().expect("server thread should complete");
        assert!(trailing.is_empty(), "no frame after rejection");
    }

    #[test]
    fn ack_with_trailing_bytes_is_rejected() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            read_init(&mut stream);
            stream.write_all(b"!!OK!more").expect("server should reply");
            bytes_after_init(&mut stream)
        });

        let report = probe(
            &endpoint,
            Duration::from_secs(2),
            config(Duration::from_millis(10)),
            &mut CollectingSink::new(),
            &CancelToken::new(),
        )
        .expect("rejection is a normal termination");

        assert_eq!(report.termination, Termination::HandshakeRejected);
        assert!(server
            .join()
            .expect("server thread should complete")
            .is_empty());
    }

    #[test]
    fn connect_to_closed_port_fails_before_handshake() {
        let (listener, endpoint) = local_listener();
        drop(listener);

        let err = probe(
            &endpoint,
            Duration::from_secs(1),
            SessionConfig::default(),
            &mut CollectingSink::new(),
            &CancelToken::new(),
        )
        .expect_err("connect should fail");

        assert!(err.is_connect_failure());
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn interrupt_while_streaming_exits_promptly() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            read_init(&mut stream);
            stream.write_all(HANDSHAKE_ACK).expect("server should ack");
            let mut frame = vec![0u8; HELLO_FRAME_HEX.len() / 2];
            stream.read_exact(&mut frame).expect("server should read frame");
            stream.write_all(b"tick").expect("server should write");
            bytes_after_init(&mut stream)
        });

        let cancel = CancelToken::new();
        let mut received: Vec<u8> = Vec::new();
        let mut sink = {
            let cancel = cancel.clone();
            move |chunk: &Bytes| {
                received.extend_from_slice(chunk);
                cancel.cancel();
            }
        };

        let start = Instant::now();
        let report = probe(
            &endpoint,
            Duration::from_secs(30),
            config(Duration::from_millis(10)),
            &mut sink,
            &cancel,
        )
        .expect("interrupt is a normal termination");

        assert_eq!(report.termination, Termination::Cancelled);
        assert_eq!(report.chunks_received, 1);
        assert!(start.elapsed() < Duration::from_secs(10));

        let trailing = server.join().expect("server thread should complete");
        assert!(trailing.is_empty(), "frame is not re-sent");
    }

    #[test]
    fn interrupt_during_connect_sends_nothing() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            bytes_after_init(&mut stream)
        });

        let cancel = CancelToken::new();
        cancel.cancel();
        let report = probe(
            &endpoint,
            Duration::from_secs(2),
            SessionConfig::default(),
            &mut CollectingSink::new(),
            &cancel,
        )
        .expect("interrupt is a normal termination");

        assert_eq!(report.termination, Termination::Cancelled);
        assert!(!report.frame_sent);
        let written = server.join().expect("server thread should complete");
        assert!(written.is_empty(), "no INIT after an interrupt");
    }

    #[test]
    fn remote_close_before_ack_is_an_error() {
        let (listener, endpoint) = local_listener();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("listener should accept");
            read_init(&mut stream);
        });

        let err = probe(
            &endpoint,
            Duration::from_secs(2),
            SessionConfig::default(),
            &mut CollectingSink::new(),
            &CancelToken::new(),
        )
        .expect_err("close before ack should fail");

        assert!(matches!(err, SessionError::Disconnected(_)));
        assert!(!err.is_connect_failure());
        server.join().expect("server thread should complete");
    }
}
