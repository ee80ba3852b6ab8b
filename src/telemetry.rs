//! telemetry.rs
//!
//! Lightweight JSONL telemetry sink for the GTS scheduler.
//!
//! # Goals
//!
//! - One JSON object per line, per event, with no effect on scheduling if
//!   anything goes wrong while writing.
//! - Controlled entirely via environment variables so experiments can
//!   turn telemetry on/off without code changes.
//!
//! # Environment variables
//!
//! - `GTS_TELEMETRY_MODE`: `"off"` (default) disables telemetry,
//!   `"jsonl"` writes JSONL to `GTS_TELEMETRY_PATH`, `"stdout"` writes the
//!   same lines to standard output.
//! - `GTS_TELEMETRY_PATH`: Path to the JSONL file. Required when mode is
//!   `"jsonl"`.
//! - `GTS_TELEMETRY_APPEND`: Optional. When set to `"1"`/`"true"`/`"yes"`,
//!   appends to existing files instead of truncating. Default is truncate.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use serde_json::{self, Value as JsonValue};

use crate::logging::EventSink;

/// Telemetry mode, controlled by GTS_TELEMETRY_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    Off,
    Jsonl,
    Stdout,
}

impl TelemetryMode {
    /// Parse a mode string. Unknown values map to Off.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "jsonl" => TelemetryMode::Jsonl,
            "stdout" => TelemetryMode::Stdout,
            _ => TelemetryMode::Off,
        }
    }

    /// Parse mode from environment. Defaults to Off.
    pub fn from_env() -> Self {
        env::var("GTS_TELEMETRY_MODE")
            .map(|s| Self::parse(&s))
            .unwrap_or(TelemetryMode::Off)
    }
}

/// Configuration for the telemetry sink.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub mode: TelemetryMode,
    pub path: Option<PathBuf>,
    pub append: bool,
}

impl TelemetryConfig {
    /// Construct from environment variables.
    pub fn from_env() -> Self {
        let mode = TelemetryMode::from_env();

        let path = if mode == TelemetryMode::Jsonl {
            env::var("GTS_TELEMETRY_PATH").ok().map(PathBuf::from)
        } else {
            None
        };

        TelemetryConfig {
            mode,
            path,
            append: Self::append_from_env(),
        }
    }

    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        TelemetryConfig {
            mode: TelemetryMode::Jsonl,
            path: Some(path.into()),
            append: false,
        }
    }

    pub fn append_from_env() -> bool {
        env::var("GTS_TELEMETRY_APPEND")
            .ok()
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}

enum Writer {
    File(BufWriter<File>),
    Stdout(io::Stdout),
}

impl Writer {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Writer::File(w) => writeln!(w, "{}", line),
            Writer::Stdout(out) => {
                let mut lock = out.lock();
                writeln!(lock, "{}", line)?;
                lock.flush()
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::File(w) => w.flush(),
            Writer::Stdout(out) => out.flush(),
        }
    }
}

/// A JSONL telemetry sink.
///
/// When mode == Off, all methods are no-ops.
/// When mode == Jsonl, the file is opened lazily on first use.
pub struct TelemetrySink {
    mode: TelemetryMode,
    path: Option<PathBuf>,
    append: bool,
    writer: Option<Writer>,
}

impl TelemetrySink {
    /// Construct a telemetry sink from environment configuration.
    ///
    /// This never fails: if configuration is invalid, it falls back to Off
    /// and logs nothing.
    pub fn from_env() -> Self {
        Self::from_config(TelemetryConfig::from_env())
    }

    pub fn from_config(cfg: TelemetryConfig) -> Self {
        TelemetrySink {
            mode: cfg.mode,
            path: cfg.path,
            append: cfg.append,
            writer: None,
        }
    }

    pub fn mode(&self) -> TelemetryMode {
        self.mode
    }

    fn ensure_writer(&mut self) -> Option<&mut Writer> {
        if self.writer.is_none() {
            match self.mode {
                TelemetryMode::Off => return None,
                TelemetryMode::Stdout => self.writer = Some(Writer::Stdout(io::stdout())),
                TelemetryMode::Jsonl => {
                    let path = match &self.path {
                        Some(p) => p.clone(),
                        None => {
                            // Misconfigured: mode Jsonl but no path.
                            self.mode = TelemetryMode::Off;
                            return None;
                        }
                    };

                    if let Some(parent) = path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }

                    let mut options = OpenOptions::new();
                    options.create(true).write(true);
                    if self.append {
                        options.append(true);
                    } else {
                        options.truncate(true);
                    }

                    match options.open(&path) {
                        Ok(f) => self.writer = Some(Writer::File(BufWriter::new(f))),
                        Err(_) => {
                            self.mode = TelemetryMode::Off;
                            return None;
                        }
                    }
                }
            }
        }

        self.writer.as_mut()
    }

    /// Log a JSON value as a single line.
    ///
    /// Write errors disable telemetry for the rest of the process; they are
    /// never propagated.
    pub fn log_json(&mut self, value: &JsonValue) {
        if self.mode == TelemetryMode::Off {
            return;
        }

        let line = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(_) => return,
        };

        let writer = match self.ensure_writer() {
            Some(w) => w,
            None => return,
        };

        if writer.write_line(&line).is_err() {
            self.mode = TelemetryMode::Off;
            self.writer = None;
        }
    }

    /// Flush the underlying writer, if any.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

impl EventSink for TelemetrySink {
    fn log_json(&mut self, record: &JsonValue) {
        TelemetrySink::log_json(self, record);
    }

    fn flush(&mut self) {
        TelemetrySink::flush(self);
    }
}

impl Drop for TelemetrySink {
    fn drop(&mut self) {
        self.flush();
    }
}
