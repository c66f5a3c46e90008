//! Deterministic source enumeration.
//!
//! Override semantics ("later source wins") only mean something if "later"
//! is the same on every machine, so the walk order is pinned down here and
//! nowhere else: files directly in the root come first, then every
//! subdirectory, recursively, in ordinal order of its full path, each
//! directory's files ordinally sorted within it. Filesystem iteration
//! order never leaks through.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Byte-wise path comparison, the ordinal order the override rule is
/// defined over. Locale-aware collation would make override results
/// machine-dependent.
fn ordinal(a: &PathBuf, b: &PathBuf) -> std::cmp::Ordering {
    a.as_os_str()
        .as_encoded_bytes()
        .cmp(b.as_os_str().as_encoded_bytes())
}

/// True if the file name ends with one of `extensions`
/// (ASCII-case-insensitive; extensions carry their leading dot).
fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_ascii_lowercase()))
}

/// Files directly inside `dir` matching `extensions`, ordinally sorted.
fn files_in(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "error reading directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "error reading directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| matches_extension(path, extensions))
        .collect();
    files.sort_by(ordinal);
    files
}

/// Collect every loadable unit under `root` in processing order.
///
/// Root files first, then each subdirectory's files, subdirectories
/// visited recursively in ordinal order of their full path. Archives are
/// plain units here; the loader expands them when their turn comes.
pub fn collect_units(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut units = files_in(root, extensions);

    let mut directories: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "error walking directory tree");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    directories.sort_by(ordinal);

    for dir in directories {
        units.extend(files_in(&dir, extensions));
    }

    units
}
