//! JSONL structured logging for sweep and probe runs.
//!
//! One line per event, append-only, machine-checkable after the fact with
//! [`validate_log_file`]. The emitter is internally locked so sweep code can
//! log through a shared reference.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, Surface};

pub const LOG_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One structured event. Build with [`LogEntry::new`] plus the `with_*`
/// methods; unset optional fields are omitted from the JSON line.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub schema_version: String,
    pub timestamp_ms: u128,
    pub run_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<Surface>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        LogEntry {
            schema_version: LOG_SCHEMA_VERSION.to_string(),
            timestamp_ms,
            run_id: String::new(),
            level,
            event: event.into(),
            surface: None,
            declared: None,
            actual: None,
            classification: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn with_pair(mut self, declared: usize, actual: usize) -> Self {
        self.declared = Some(declared);
        self.actual = Some(actual);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Append-only JSONL writer, one [`LogEntry`] per line.
pub struct LogEmitter {
    run_id: String,
    writer: Mutex<BufWriter<File>>,
}

impl LogEmitter {
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(LogEmitter {
            run_id: run_id.to_string(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn emit_entry(&self, mut entry: LogEntry) -> std::io::Result<()> {
        entry.run_id.clone_from(&self.run_id);
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

/// Re-read a finished log file and report `(line_count, errors)`: every line
/// must parse as a [`LogEntry`] with the current schema version and a
/// non-empty run id.
pub fn validate_log_file(path: &Path) -> std::io::Result<(usize, Vec<String>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut line_count = 0usize;
    let mut errors = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        line_count += 1;
        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => {
                if entry.schema_version != LOG_SCHEMA_VERSION {
                    errors.push(format!(
                        "line {}: schema_version '{}' (expected '{LOG_SCHEMA_VERSION}')",
                        idx + 1,
                        entry.schema_version
                    ));
                }
                if entry.run_id.is_empty() {
                    errors.push(format!("line {}: empty run_id", idx + 1));
                }
            }
            Err(e) => errors.push(format!("line {}: {e}", idx + 1)),
        }
    }
    Ok((line_count, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitted_lines_validate() {
        let dir = std::env::temp_dir().join("cfieval-structured-log-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(format!("log-{}.jsonl", std::process::id()));

        let emitter = LogEmitter::to_file(&path, "unit-test").expect("emitter");
        emitter
            .emit_entry(LogEntry::new(LogLevel::Info, "sweep.start"))
            .expect("emit");
        emitter
            .emit_entry(
                LogEntry::new(LogLevel::Warn, "sweep.cell")
                    .with_surface(Surface::Aggregate)
                    .with_pair(3, 7)
                    .with_classification(Classification::FalseNegative)
                    .with_details(serde_json::json!({ "note": "example" })),
            )
            .expect("emit");

        let (lines, errors) = validate_log_file(&path).expect("validate");
        assert_eq!(lines, 2);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_lines_are_reported() {
        let dir = std::env::temp_dir().join("cfieval-structured-log-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(format!("bad-{}.jsonl", std::process::id()));
        std::fs::write(&path, "{\"not\": \"a log entry\"}\nnot json at all\n").expect("write");

        let (lines, errors) = validate_log_file(&path).expect("validate");
        assert_eq!(lines, 2);
        assert_eq!(errors.len(), 2);

        std::fs::remove_file(&path).ok();
    }
}
