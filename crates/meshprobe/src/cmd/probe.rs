use bytes::Bytes;
use meshprobe_frame::from_hex;
use meshprobe_session::{
    node_identifier, probe, HandshakeConfig, SessionConfig, DEFAULT_IDENTIFIER,
};
use meshprobe_transport::{CancelToken, Endpoint, MAX_RECV_BUFFER_SIZE};
use tracing::info;

use crate::cmd::{parse_delay, parse_duration, ProbeArgs};
use crate::exit::{frame_error, session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{ChunkPrinter, OutputFormat};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let endpoint = Endpoint::new(args.host.clone(), args.port);
    let config = session_config(&args)?;

    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    info!(
        %endpoint,
        identifier = %config.handshake.identifier,
        timeout_ms = timeout.as_millis() as u64,
        "probing"
    );

    let mut printer = ChunkPrinter::stdout(format);
    let report = probe(&endpoint, timeout, config, &mut printer, &cancel)
        .map_err(|err| session_error("probe failed", err))?;

    printer.finish(&endpoint, &report);
    Ok(SUCCESS)
}

fn session_config(args: &ProbeArgs) -> CliResult<SessionConfig> {
    let identifier = match (&args.identifier, args.node) {
        (Some(identifier), _) => identifier.clone(),
        (None, Some(node)) => node_identifier(node),
        (None, None) => DEFAULT_IDENTIFIER.to_string(),
    };
    if identifier.contains(['|', '\n']) {
        return Err(CliError::usage(
            "identifier must not contain '|' or a newline",
        ));
    }
    if args.ack.is_empty() {
        return Err(CliError::usage("--ack must not be empty"));
    }
    if args.buffer_size == 0 || args.buffer_size > MAX_RECV_BUFFER_SIZE {
        return Err(CliError::usage(format!(
            "--buffer-size must be between 1 and {MAX_RECV_BUFFER_SIZE}"
        )));
    }

    let mut config = SessionConfig {
        handshake: HandshakeConfig {
            identifier,
            announce_port: args.announce_port,
            expected_ack: Bytes::from(args.ack.clone().into_bytes()),
            ..HandshakeConfig::default()
        },
        pacing_delay: parse_delay(&args.delay)?,
        recv_buffer_size: args.buffer_size,
        ..SessionConfig::default()
    };

    if let Some(hex) = &args.frame {
        let frame = from_hex(hex).map_err(|err| frame_error("--frame", err))?;
        if frame.is_empty() {
            return Err(CliError::usage("--frame must not be empty"));
        }
        config.frame = Bytes::from(frame);
    }

    Ok(config)
}

fn install_ctrlc_handler(cancel: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use meshprobe_frame::to_hex;

    use super::*;
    use crate::exit::USAGE;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ProbeArgs,
    }

    fn args(extra: &[&str]) -> ProbeArgs {
        let argv = std::iter::once("probe").chain(extra.iter().copied());
        Harness::try_parse_from(argv)
            .expect("probe args should parse")
            .args
    }

    #[test]
    fn defaults_match_reference_run() {
        let config = session_config(&args(&[])).expect("defaults should be valid");
        assert_eq!(
            config.handshake.request().encode().as_ref(),
            b"INIT|0.28.135.104|6053\n"
        );
        assert_eq!(config.handshake.expected_ack.as_ref(), b"!!OK!");
        assert_eq!(
            to_hex(&config.frame),
            "0013010a0d61696f657370686f6d6561706910011807"
        );
        assert_eq!(config.pacing_delay, Duration::from_millis(500));
        assert_eq!(config.recv_buffer_size, 4096);
    }

    #[test]
    fn node_id_becomes_dotted_identifier() {
        let config = session_config(&args(&["--node", "0x010203"])).expect("valid node");
        assert_eq!(config.handshake.identifier, "0.1.2.3");
    }

    #[test]
    fn custom_frame_and_delay() {
        let config = session_config(&args(&["--frame", "00 00 07", "--delay", "0"]))
            .expect("valid overrides");
        assert_eq!(config.frame.as_ref(), b"\x00\x00\x07");
        assert_eq!(config.pacing_delay, Duration::ZERO);
    }

    #[test]
    fn invalid_overrides_are_usage_errors() {
        for extra in [
            &["--frame", "zz"][..],
            &["--frame", ""],
            &["--identifier", "a|b"],
            &["--ack", ""],
            &["--buffer-size", "0"],
            &["--buffer-size", "1048577"],
            &["--buffer-size", "18446744073709551615"],
            &["--delay", "soon"],
        ] {
            let err = session_config(&args(extra)).expect_err("override should be rejected");
            assert_eq!(err.code, USAGE, "{extra:?}");
        }
    }
}
