use std::time::Duration;

use clap::{Args, Subcommand};
use meshprobe_frame::{DEFAULT_API_VERSION_MAJOR, DEFAULT_API_VERSION_MINOR, DEFAULT_CLIENT_INFO};
use meshprobe_session::DEFAULT_RECV_BUFFER_SIZE;
use meshprobe_transport::{DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod hello;
pub mod probe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Handshake with the proxy, send one frame and dump the replies.
    Probe(ProbeArgs),
    /// Print the encoded HelloRequest frame.
    Hello(HelloArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Hello(args) => hello::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Proxy host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Proxy port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Identifier sent in the INIT line.
    #[arg(long, conflicts_with = "node")]
    pub identifier: Option<String>,
    /// Mesh node id (e.g. 0x1C8768, N1C8768); sent as its dotted identifier.
    #[arg(long, value_parser = parse_node_id)]
    pub node: Option<u32>,
    /// Port announced in the INIT line.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub announce_port: u16,
    /// Connect and per-read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Wait between acknowledgment and frame write (e.g. 500ms, 0).
    #[arg(long, default_value = "500ms")]
    pub delay: String,
    /// Frame to send after the handshake, as hex. Default: HelloRequest.
    #[arg(long, value_name = "HEX")]
    pub frame: Option<String>,
    /// Acknowledgment required before the frame is sent.
    #[arg(long, default_value = "!!OK!")]
    pub ack: String,
    /// Bytes requested per receive.
    #[arg(long, default_value_t = DEFAULT_RECV_BUFFER_SIZE)]
    pub buffer_size: usize,
}

#[derive(Args, Debug)]
pub struct HelloArgs {
    /// Client name announced in the hello.
    #[arg(long, default_value = DEFAULT_CLIENT_INFO)]
    pub client_info: String,
    /// API major version.
    #[arg(long, default_value_t = DEFAULT_API_VERSION_MAJOR)]
    pub major: u32,
    /// API minor version.
    #[arg(long, default_value_t = DEFAULT_API_VERSION_MINOR)]
    pub minor: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `150ms` or a bare number of seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_delay(input)?;
    if duration.is_zero() {
        return Err(CliError::usage("duration must be greater than zero"));
    }
    Ok(duration)
}

/// Like [`parse_duration`] but zero is allowed.
pub fn parse_delay(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Node ids are hex when prefixed with `0x` or `N`, decimal otherwise.
fn parse_node_id(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .or_else(|| input.strip_prefix('N'))
    {
        u32::from_str_radix(hex, 16)
    } else {
        input.parse()
    };
    let id = parsed.map_err(|err| format!("invalid node id {input:?}: {err}"))?;
    if id > 0x00FF_FFFF {
        return Err(format!("node id {input} does not fit in 24 bits"));
    }
    Ok(id)
}
