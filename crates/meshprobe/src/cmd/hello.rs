use std::io::Write;

use meshprobe_frame::{to_hex, HelloRequest};
use serde::Serialize;

use crate::cmd::HelloArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct HelloOutput {
    client_info: String,
    api_version: String,
    size: usize,
    hex: String,
}

pub fn run(args: HelloArgs, format: OutputFormat) -> CliResult<i32> {
    let hello = HelloRequest {
        client_info: args.client_info,
        api_version_major: args.major,
        api_version_minor: args.minor,
    };
    let bytes = hello
        .to_frame_bytes()
        .map_err(|err| frame_error("encode failed", err))?;

    match format {
        OutputFormat::Json => {
            let out = HelloOutput {
                api_version: format!("{}.{}", hello.api_version_major, hello.api_version_minor),
                client_info: hello.client_info,
                size: bytes.len(),
                hex: to_hex(&bytes),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => {
            let mut stdout = std::io::stdout();
            stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(|err| io_error("write failed", err))?;
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", to_hex(&bytes)),
    }

    Ok(SUCCESS)
}
