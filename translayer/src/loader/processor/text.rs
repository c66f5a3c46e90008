//! Line-tab translation format (`.txt`).
//!
//! One entry per line: `original<TAB>translation`, both sides escaped so an
//! entry always fits on one line. `;` starts a comment line. An original
//! beginning with `$` registers a regex rule instead of an exact entry:
//! the pattern is the original minus the `$`, the translation side is its
//! expansion template.
//!
//! ```text
//! ; weapon names
//! Iron Sword<TAB>鉄の剣
//! $^Lv\.(\d+)$<TAB>レベル$1
//! ```

use std::io::{BufRead, BufReader, Read};

use regex::Regex;
use tracing::warn;

use crate::loader::{LoadResult, RegexRule};
use crate::text::{strip_marker, unescape};

use super::{FormatProcessor, ProcessError};

/// Processor for the line-tab format.
#[derive(Debug, Default)]
pub struct LineTabProcessor;

impl LineTabProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl FormatProcessor for LineTabProcessor {
    fn extension(&self) -> &'static str {
        ".txt"
    }

    fn process(
        &self,
        reader: &mut dyn Read,
        result: &mut LoadResult,
    ) -> Result<u32, ProcessError> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut entries = 0u32;
        let mut first_line = true;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            // Sources are UTF-8 by convention; decode each line lossily so
            // one bad sequence costs a replacement character, not the file.
            let line = String::from_utf8_lossy(&buf);
            let mut line = line.trim_end_matches(['\r', '\n']);
            if first_line {
                line = line.trim_start_matches('\u{feff}');
                first_line = false;
            }
            if process_line(line, result) {
                entries += 1;
            }
        }

        Ok(entries)
    }
}

/// Parse one line into `result`. Returns whether an entry was merged;
/// comments, blanks and malformed lines all answer `false`.
fn process_line(line: &str, result: &mut LoadResult) -> bool {
    if line.is_empty() || line.starts_with(';') {
        return false;
    }

    let Some((raw_original, raw_translation)) = line.split_once('\t') else {
        return false;
    };

    let original = unescape(raw_original);
    let translation = strip_marker(unescape(raw_translation));
    if original.is_empty() || translation.is_empty() {
        return false;
    }

    if let Some(pattern) = original.strip_prefix('$') {
        match Regex::new(pattern) {
            Ok(pattern) => result.regex_rules.push(RegexRule {
                pattern,
                template: translation,
            }),
            Err(e) => {
                warn!(pattern, error = %e, "skipping rule with invalid pattern");
                return false;
            }
        }
    } else {
        result.entries.insert(original, translation);
    }

    true
}
