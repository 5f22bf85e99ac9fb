mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

const AFTER_HELP: &str = "\
Examples:
  meshprobe probe --host 192.168.1.20 --node 0x1C8768
  meshprobe --format pretty probe --timeout 10s --delay 1s
  meshprobe hello --client-info meshprobe

Exit codes:
  0    session ended normally (handshake rejected, timed out, closed or interrupted)
  1    connection refused or dropped
  3    other transport error
  50   permission denied
  64   invalid arguments
  124  connect timed out
  125  internal error";

#[derive(Parser, Debug)]
#[command(
    name = "meshprobe",
    version,
    about = "Diagnostic client for the meshmesh ESPHome API proxy",
    long_about = "Connects to a meshmesh ESPHome API proxy, sends the INIT handshake, \
                  and once the proxy acknowledges, sends one native API frame and \
                  dumps every chunk the device sends back.",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?format, "meshprobe starting");
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_lists_exit_codes() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Exit codes:"));
        assert!(help.contains("124  connect timed out"));
    }

    #[test]
    fn parses_probe_subcommand() {
        let cli = Cli::try_parse_from([
            "meshprobe",
            "probe",
            "--host",
            "192.168.1.20",
            "--port",
            "6053",
            "--timeout",
            "3s",
        ])
        .expect("probe args should parse");

        match cli.command {
            Command::Probe(args) => {
                assert_eq!(args.host, "192.168.1.20");
                assert_eq!(args.timeout, "3s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_identifier_with_node() {
        let err = Cli::try_parse_from([
            "meshprobe",
            "probe",
            "--identifier",
            "0.1.2.3",
            "--node",
            "0x010203",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["meshprobe", "hello", "--format", "json"])
            .expect("hello args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Command::Hello(_)));
    }
}
