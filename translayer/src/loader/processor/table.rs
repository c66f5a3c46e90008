//! Tabular translation format (`.csv`).
//!
//! Three columns, `Term`, `Original` and `Translation`, with a header row.
//! Header matching is ASCII-case-insensitive and whitespace-tolerant, so
//! `term, ORIGINAL ,Translation` is accepted. `#` starts a comment line;
//! blank lines are ignored; the `Original` column is informational and may
//! be missing entirely. Rows without a term or translation are skipped.
//!
//! This is also the shape the untranslated export writes, so a dumped file
//! can be filled in and dropped back into a translation directory as-is.

use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use crate::loader::LoadResult;

use super::{FormatProcessor, ProcessError};

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    term: String,
    #[serde(default)]
    translation: String,
}

/// Processor for the tabular format.
#[derive(Debug, Default)]
pub struct TableProcessor;

impl TableProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl FormatProcessor for TableProcessor {
    fn extension(&self) -> &'static str {
        ".csv"
    }

    fn process(
        &self,
        reader: &mut dyn Read,
        result: &mut LoadResult,
    ) -> Result<u32, ProcessError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        // Fold the header row so `Term`/`term`/` TERM ` all bind to the
        // same field before serde sees them.
        let folded = match csv_reader.headers() {
            Ok(headers) => headers
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .collect::<csv::StringRecord>(),
            Err(e) => {
                warn!(error = %e, "table file has an unreadable header row");
                return Ok(0);
            }
        };
        csv_reader.set_headers(folded);

        let mut entries = 0u32;
        for row in csv_reader.deserialize::<Row>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping malformed table row");
                    continue;
                }
            };
            if row.term.is_empty() || row.translation.is_empty() {
                continue;
            }
            result.entries.insert(row.term, row.translation);
            entries += 1;
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn process(input: &str) -> (LoadResult, u32) {
        let mut result = LoadResult::default();
        let count = TableProcessor::new()
            .process(&mut Cursor::new(input.as_bytes().to_vec()), &mut result)
            .unwrap();
        (result, count)
    }

    #[test]
    fn test_basic_rows() {
        let (result, count) = process(
            "Term,Original,Translation\n\
             UI/Button/OK,OK,確定\n\
             UI/Button/Cancel,Cancel,キャンセル\n",
        );
        assert_eq!(count, 2);
        assert_eq!(result.entries["UI/Button/OK"], "確定");
        assert_eq!(result.entries["UI/Button/Cancel"], "キャンセル");
    }

    #[test]
    fn test_header_case_and_whitespace_tolerated() {
        let (result, count) = process("term , ORIGINAL,  Translation\nkey,orig,value\n");
        assert_eq!(count, 1);
        assert_eq!(result.entries["key"], "value");
    }

    #[test]
    fn test_missing_original_column() {
        let (result, count) = process("Term,Translation\nkey,value\n");
        assert_eq!(count, 1);
        assert_eq!(result.entries["key"], "value");
    }

    #[test]
    fn test_blank_term_or_translation_skipped() {
        let (result, count) = process(
            "Term,Original,Translation\n\
             ,orig,value\n\
             key,orig,\n\
             good,orig,value\n",
        );
        assert_eq!(count, 1);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries["good"], "value");
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let (result, count) = process(
            "Term,Original,Translation\n\
             # a comment\n\
             \n\
             key,orig,value\n",
        );
        assert_eq!(count, 1);
        assert_eq!(result.entries["key"], "value");
    }

    #[test]
    fn test_short_row_tolerated() {
        // Flexible parsing: a row missing trailing columns deserializes
        // with defaults and is then skipped for lacking a translation.
        let (result, count) = process("Term,Original,Translation\nlonely\nkey,orig,value\n");
        assert_eq!(count, 1);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_quoted_fields() {
        let (result, _) = process(
            "Term,Original,Translation\n\
             key,\"orig, with comma\",\"multi\nline\"\n",
        );
        assert_eq!(result.entries["key"], "multi\nline");
    }

    #[test]
    fn test_later_row_wins() {
        let (result, _) = process("Term,Original,Translation\nkey,o,first\nkey,o,second\n");
        assert_eq!(result.entries["key"], "second");
    }
}
