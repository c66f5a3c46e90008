//! Untranslated key export.
//!
//! Every distinct key the resolver misses can be captured for translators
//! to fill in later. Records buffer in memory and flush in batches, once
//! the configured threshold is reached and again on drop, as CSV rows in
//! the same `Term,Original,Translation` shape the tabular loader reads, so
//! a completed dump goes straight back into a translation directory.
//!
//! Write failures are reported and swallowed: losing an export batch must
//! never take down resolution.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Default number of buffered records that triggers a flush.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

/// Errors from writing the export file. Internal to the sink: callers of
/// [`UntranslatedSink::record`] never see them.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export file could not be opened or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One missed key, with the on-screen original text when the caller had
/// it. The `Translation` column is always empty: it is the blank a
/// translator fills in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UntranslatedRecord {
    term: String,
    original: String,
    translation: String,
}

/// Deduplicated, buffered recorder of unresolved keys.
///
/// Not internally synchronized; the resolver shares it behind a mutex.
pub struct UntranslatedSink {
    path: PathBuf,
    flush_threshold: usize,
    seen: HashSet<String>,
    buffer: Vec<UntranslatedRecord>,
}

impl UntranslatedSink {
    /// Create a sink appending to `path`, flushing every
    /// [`DEFAULT_FLUSH_THRESHOLD`] records.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            seen: HashSet::new(),
            buffer: Vec::new(),
        }
    }

    /// Override the flush threshold. A threshold of 1 flushes every
    /// record immediately.
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// The export file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Record a missed key. Whitespace-only keys are ignored; a key is
    /// recorded at most once per sink lifetime.
    pub fn record(&mut self, key: &str, sample: Option<&str>) {
        if key.trim().is_empty() {
            return;
        }
        if !self.seen.insert(key.to_string()) {
            return;
        }
        debug!(key, "recording untranslated key");

        self.buffer.push(UntranslatedRecord {
            term: key.to_string(),
            original: sample.unwrap_or_default().to_string(),
            translation: String::new(),
        });
        if self.buffer.len() >= self.flush_threshold {
            self.flush();
        }
    }

    /// Number of records waiting to be written.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Write buffered records to the export file.
    ///
    /// Failures are logged and the batch is dropped rather than retried:
    /// the keys stay deduplicated in memory, and an export file that
    /// cannot be written once will rarely heal by accumulating more data.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Err(e) = self.write_buffer() {
            error!(path = %self.path.display(), error = %e, "failed to write untranslated export");
        }
        self.buffer.clear();
    }

    fn write_buffer(&mut self) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new_file = file.metadata()?.len() == 0;
        if is_new_file {
            writeln!(
                file,
                "# untranslated keys, collected {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            )?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new_file {
            writer.write_record(["Term", "Original", "Translation"])?;
        }
        for record in &self.buffer {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Drop for UntranslatedSink {
    fn drop(&mut self) {
        self.flush();
    }
}
