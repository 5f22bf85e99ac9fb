use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use meshprobe_frame::{message_name, to_hex, Frame, FrameScanner};
use meshprobe_session::{ChunkSink, SessionReport};
use meshprobe_transport::Endpoint;
use serde::Serialize;

const PREVIEW_BYTES: usize = 24;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameSummary {
    msg_type: u32,
    name: &'static str,
    size: usize,
}

impl From<&Frame> for FrameSummary {
    fn from(frame: &Frame) -> Self {
        Self {
            msg_type: frame.msg_type,
            name: message_name(frame.msg_type),
            size: frame.payload.len(),
        }
    }
}

#[derive(Serialize)]
struct ChunkOutput<'a> {
    kind: &'static str,
    index: usize,
    size: usize,
    hex: String,
    frames: Vec<FrameSummary>,
    timestamp: &'a str,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    kind: &'static str,
    endpoint: String,
    #[serde(flatten)]
    report: &'a SessionReport,
    frames_decoded: usize,
    bytes_skipped: usize,
}

struct FrameRow {
    chunk: usize,
    frame: Frame,
}

/// Display collaborator: renders each chunk as it arrives.
///
/// Chunks are written exactly as received; the frame decoding shown beside
/// them is informational and never alters what was read.
pub struct ChunkPrinter<W: Write> {
    out: W,
    format: OutputFormat,
    scanner: FrameScanner,
    chunks: usize,
    rows: Vec<FrameRow>,
}

impl ChunkPrinter<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> ChunkPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            scanner: FrameScanner::new(),
            chunks: 0,
            rows: Vec::new(),
        }
    }

    /// Print the end-of-session summary.
    pub fn finish(&mut self, endpoint: &Endpoint, report: &SessionReport) {
        match self.format {
            OutputFormat::Json => {
                let out = SummaryOutput {
                    kind: "summary",
                    endpoint: endpoint.to_string(),
                    report,
                    frames_decoded: self.rows.len(),
                    bytes_skipped: self.scanner.skipped(),
                };
                let line = serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string());
                let _ = writeln!(self.out, "{line}");
            }
            OutputFormat::Table => {
                if !self.rows.is_empty() {
                    let _ = writeln!(self.out, "{}", self.frames_table());
                }
                let _ = writeln!(self.out, "{}", summary_table(endpoint, report));
            }
            OutputFormat::Pretty => {
                let _ = writeln!(
                    self.out,
                    "endpoint={} termination={} frame_sent={} chunks={} bytes={} elapsed_ms={}",
                    endpoint,
                    report.termination,
                    report.frame_sent,
                    report.chunks_received,
                    report.bytes_received,
                    report.elapsed_ms
                );
            }
            OutputFormat::Raw => {}
        }
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn frames_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["CHUNK", "TYPE", "MESSAGE", "SIZE", "PAYLOAD"]);
        for row in &self.rows {
            table.add_row(vec![
                row.chunk.to_string(),
                row.frame.msg_type.to_string(),
                message_name(row.frame.msg_type).to_string(),
                row.frame.payload.len().to_string(),
                payload_preview(&row.frame.payload),
            ]);
        }
        table
    }
}

impl<W: Write> ChunkSink for ChunkPrinter<W> {
    fn on_chunk(&mut self, chunk: &Bytes) {
        self.chunks += 1;
        let index = self.chunks;
        let frames = self.scanner.push(chunk);

        match self.format {
            OutputFormat::Json => {
                let timestamp = now_unix_seconds();
                let out = ChunkOutput {
                    kind: "chunk",
                    index,
                    size: chunk.len(),
                    hex: to_hex(chunk),
                    frames: frames.iter().map(FrameSummary::from).collect(),
                    timestamp: &timestamp,
                };
                let line = serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string());
                let _ = writeln!(self.out, "{line}");
            }
            OutputFormat::Pretty => {
                let _ = writeln!(self.out, "{}", to_hex(chunk));
                for frame in &frames {
                    let _ = writeln!(
                        self.out,
                        "  type={} ({}) size={}",
                        frame.msg_type,
                        message_name(frame.msg_type),
                        frame.payload.len()
                    );
                }
            }
            OutputFormat::Raw => {
                let _ = self.out.write_all(chunk);
            }
            OutputFormat::Table => {}
        }
        let _ = self.out.flush();

        self.rows
            .extend(frames.into_iter().map(|frame| FrameRow { chunk: index, frame }));
    }
}

fn summary_table(endpoint: &Endpoint, report: &SessionReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ENDPOINT", "TERMINATION", "FRAME SENT", "CHUNKS", "BYTES", "REPLY"])
        .add_row(vec![
            endpoint.to_string(),
            report.termination.to_string(),
            report.frame_sent.to_string(),
            report.chunks_received.to_string(),
            report.bytes_received.to_string(),
            report.handshake_reply_hex.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    table
}

fn payload_preview(payload: &[u8]) -> String {
    if payload.len() <= PREVIEW_BYTES {
        to_hex(payload)
    } else {
        format!("{}… (+{})", to_hex(&payload[..PREVIEW_BYTES]), payload.len() - PREVIEW_BYTES)
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
