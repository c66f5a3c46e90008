//! Pluggable translation file formats.
//!
//! Each format implements [`FormatProcessor`]: it owns exactly one syntax
//! and merges whatever it can parse from a byte stream into an in-progress
//! [`LoadResult`](crate::loader::LoadResult). A [`ProcessorSet`] maps file
//! extensions to processors so the loader can dispatch loose files and
//! archive members the same way.
//!
//! Processors are tolerant by contract: a malformed line or row is skipped
//! and the rest of the file continues. Only a hard I/O failure aborts a
//! unit, and the loader confines even that to the unit that failed.

mod table;
mod text;

pub use table::TableProcessor;
pub use text::LineTabProcessor;

use std::io::Read;

use thiserror::Error;

use crate::loader::LoadResult;

/// Errors that abort processing of a single unit.
///
/// Anything below unit granularity (a bad line, a bad row) is skipped
/// inside the processor and never surfaces here.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// I/O failure while reading the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One translation file format.
pub trait FormatProcessor: Send + Sync {
    /// The file extension this processor handles, lowercase with the
    /// leading dot (e.g. `".txt"`).
    fn extension(&self) -> &'static str;

    /// Parse `reader` and merge entries into `result`.
    ///
    /// Returns the number of entries merged. Entries merged before a
    /// failure stay merged; the caller treats an `Err` as "this unit is
    /// done, keep what we got".
    fn process(&self, reader: &mut dyn Read, result: &mut LoadResult)
        -> Result<u32, ProcessError>;
}

/// The processors registered for one loader, indexed by extension.
pub struct ProcessorSet {
    processors: Vec<Box<dyn FormatProcessor>>,
}

impl ProcessorSet {
    /// Bundle processors for a loader.
    ///
    /// # Panics
    ///
    /// Panics if `processors` is empty; a loader without any format to
    /// dispatch to is a wiring error.
    pub fn new(processors: Vec<Box<dyn FormatProcessor>>) -> Self {
        assert!(
            !processors.is_empty(),
            "a ProcessorSet needs at least one format processor"
        );
        Self { processors }
    }

    /// Find the processor for a file or member name by extension suffix,
    /// ASCII-case-insensitively.
    pub fn find(&self, name: &str) -> Option<&dyn FormatProcessor> {
        let name = name.to_ascii_lowercase();
        self.processors
            .iter()
            .find(|p| name.ends_with(p.extension()))
            .map(|p| p.as_ref())
    }

    /// All extensions this set accepts from a directory walk, including
    /// the archive container extension.
    pub fn accepted_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .processors
            .iter()
            .map(|p| p.extension().to_string())
            .collect();
        extensions.push(".zip".to_string());
        extensions
    }
}
