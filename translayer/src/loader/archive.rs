//! Archive expansion for `.zip` translation packs.
//!
//! An archive is one unit in the loader's outer ordering; its members are
//! dispatched to format processors exactly as loose files would be. Two
//! member orders are supported and the choice is the caller's, because
//! they produce different override winners when one archive contains
//! duplicate keys:
//!
//! - [`ArchiveOrder::Physical`] streams members as they are laid out in
//!   the file, front to back, with no seeking. Fast, and the order the
//!   archive author wrote the members in.
//! - [`ArchiveOrder::SortedByName`] indexes the archive first and
//!   processes members in ordinal name order, the same rule loose files
//!   follow on disk.
//!
//! Member paths are vetted before any processor sees them: traversal
//! segments, absolute paths and rooted paths are dropped with a warning.
//! Nothing is ever extracted to disk, but hostile archives should not get
//! to pick their lookup keys via path tricks either.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{info, warn};

use crate::loader::processor::ProcessorSet;
use crate::loader::LoadResult;

/// Member processing order within one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOrder {
    /// Stream members in on-disk order, front to back.
    Physical,
    /// Index the archive and process members in ordinal name order.
    SortedByName,
}

impl Default for ArchiveOrder {
    /// Streaming is the default: it needs no central-directory pass and
    /// preserves the order the pack author chose.
    fn default() -> Self {
        ArchiveOrder::Physical
    }
}

/// Errors that abort processing of a whole archive unit.
///
/// Failures on individual members are logged and skipped instead.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("failed to open archive: {0}")]
    Open(#[source] std::io::Error),

    /// The archive container itself is unreadable.
    #[error("invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Reject member paths that could confuse downstream consumers of the
/// keys: empty names, `..` traversal segments, absolute paths, and paths
/// with a leading separator. Checked against both separator styles since
/// archives are authored on every platform.
pub fn is_unsafe_entry_path(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }
    // Windows drive-rooted form, e.g. `C:\evil` or `C:evil`.
    let mut chars = name.chars();
    if let (Some(first), Some(':')) = (chars.next(), chars.next()) {
        if first.is_ascii_alphabetic() {
            return true;
        }
    }
    name.split(['/', '\\']).any(|segment| segment == "..")
}

/// Expand one archive unit into `result`, dispatching each member by its
/// own extension. Returns the number of entries merged.
pub(crate) fn process_archive(
    path: &Path,
    order: ArchiveOrder,
    processors: &ProcessorSet,
    result: &mut LoadResult,
    cancel: &AtomicBool,
) -> Result<u32, ArchiveError> {
    match order {
        ArchiveOrder::Physical => process_streaming(path, processors, result, cancel),
        ArchiveOrder::SortedByName => process_sorted(path, processors, result),
    }
}

/// Stream members front to back. The cancellation flag is honored between
/// members, so an oversized archive cannot pin the worker once a cancel
/// has been requested.
fn process_streaming(
    path: &Path,
    processors: &ProcessorSet,
    result: &mut LoadResult,
    cancel: &AtomicBool,
) -> Result<u32, ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Open)?;
    let mut reader = BufReader::new(file);
    let mut entries = 0u32;

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!(archive = %path.display(), "archive processing cancelled");
            break;
        }
        let mut member = match zip::read::read_zipfile_from_stream(&mut reader)? {
            Some(member) => member,
            None => break,
        };
        if !member.is_file() {
            continue;
        }
        let name = member.name().to_string();
        if is_unsafe_entry_path(&name) {
            warn!(archive = %path.display(), member = %name, "skipping unsafe archive member");
            continue;
        }
        let Some(processor) = processors.find(&name) else {
            continue;
        };
        match processor.process(&mut member, result) {
            Ok(added) => entries += added,
            Err(e) => {
                warn!(archive = %path.display(), member = %name, error = %e,
                    "error processing archive member");
            }
        }
    }

    Ok(entries)
}

/// Index the archive, then process supported members in ordinal name
/// order, the deterministic-override mode.
fn process_sorted(
    path: &Path,
    processors: &ProcessorSet,
    result: &mut LoadResult,
) -> Result<u32, ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Open)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    let mut names: Vec<String> = Vec::new();
    for name in archive.file_names() {
        if name.ends_with('/') || name.ends_with('\\') {
            continue;
        }
        if is_unsafe_entry_path(name) {
            warn!(archive = %path.display(), member = %name, "skipping unsafe archive member");
            continue;
        }
        if processors.find(name).is_some() {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        info!(archive = %path.display(), "no supported members in archive");
        return Ok(0);
    }
    names.sort();

    let mut entries = 0u32;
    for name in &names {
        let mut member = match archive.by_name(name) {
            Ok(member) => member,
            Err(e) => {
                warn!(archive = %path.display(), member = %name, error = %e,
                    "error opening archive member");
                continue;
            }
        };
        let Some(processor) = processors.find(name) else {
            continue;
        };
        match processor.process(&mut member, result) {
            Ok(added) => entries += added,
            Err(e) => {
                warn!(archive = %path.display(), member = %name, error = %e,
                    "error processing archive member");
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    use crate::loader::processor::{LineTabProcessor, ProcessorSet};

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn processors() -> ProcessorSet {
        ProcessorSet::new(vec![Box::new(LineTabProcessor::new())])
    }

    fn expand(path: &Path, order: ArchiveOrder) -> LoadResult {
        let mut result = LoadResult::default();
        let cancel = AtomicBool::new(false);
        process_archive(path, order, &processors(), &mut result, &cancel).unwrap();
        result
    }

    #[test]
    fn test_unsafe_paths() {
        assert!(is_unsafe_entry_path(""));
        assert!(is_unsafe_entry_path("../../etc/passwd"));
        assert!(is_unsafe_entry_path("/etc/passwd"));
        assert!(is_unsafe_entry_path("\\windows\\system32"));
        assert!(is_unsafe_entry_path("a/../b.txt"));
        assert!(is_unsafe_entry_path("C:\\evil.txt"));
        assert!(is_unsafe_entry_path("c:relative.txt"));
        assert!(!is_unsafe_entry_path("pack/good.txt"));
        assert!(!is_unsafe_entry_path("dots..in..name.txt"));
    }

    #[test]
    fn test_streaming_processes_members_in_physical_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        // Members written z-first; in physical order a.txt is processed
        // last and wins despite sorting first by name.
        write_zip(&path, &[("z.txt", "key\tfrom-z\n"), ("a.txt", "key\tfrom-a\n")]);

        let result = expand(&path, ArchiveOrder::Physical);
        assert_eq!(result.entries["key"], "from-a");
    }

    #[test]
    fn test_sorted_processes_members_in_name_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        write_zip(&path, &[("z.txt", "key\tfrom-z\n"), ("a.txt", "key\tfrom-a\n")]);

        let result = expand(&path, ArchiveOrder::SortedByName);
        // Ordinal name order processes a.txt then z.txt; z wins.
        assert_eq!(result.entries["key"], "from-z");
    }

    #[test]
    fn test_unsafe_members_never_contribute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evil.zip");
        write_zip(
            &path,
            &[
                ("../../etc/passwd.txt", "evil\tvalue\n"),
                ("good.txt", "good\tvalue\n"),
            ],
        );

        for order in [ArchiveOrder::Physical, ArchiveOrder::SortedByName] {
            let result = expand(&path, order);
            assert_eq!(result.entries.len(), 1);
            assert!(result.entries.contains_key("good"));
        }
    }

    #[test]
    fn test_unsupported_members_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        write_zip(
            &path,
            &[("readme.md", "not a translation"), ("a.txt", "key\tvalue\n")],
        );

        let result = expand(&path, ArchiveOrder::Physical);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_cancel_stops_streaming_between_members() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.zip");
        write_zip(&path, &[("a.txt", "a\t1\n"), ("b.txt", "b\t2\n")]);

        let mut result = LoadResult::default();
        let cancel = AtomicBool::new(true);
        let added =
            process_archive(&path, ArchiveOrder::Physical, &processors(), &mut result, &cancel)
                .unwrap();
        assert_eq!(added, 0);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_missing_archive_is_error() {
        let dir = TempDir::new().unwrap();
        let mut result = LoadResult::default();
        let cancel = AtomicBool::new(false);
        let err = process_archive(
            &dir.path().join("absent.zip"),
            ArchiveOrder::Physical,
            &processors(),
            &mut result,
            &cancel,
        );
        assert!(matches!(err, Err(ArchiveError::Open(_))));
    }
}
