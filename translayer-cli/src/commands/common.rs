//! Shared argument plumbing for the load-style commands.

use std::path::PathBuf;

use clap::ValueEnum;
use translayer::loader::{LineTabProcessor, ProcessorSet, TableProcessor};
use translayer::{ArchiveOrder, ConfigFile};

/// Which source formats a pass accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Line-tab text files only
    Txt,
    /// Tabular term files only
    Csv,
    /// Both formats
    All,
}

impl Format {
    pub fn processor_set(self) -> ProcessorSet {
        match self {
            Format::Txt => ProcessorSet::new(vec![Box::new(LineTabProcessor::new())]),
            Format::Csv => ProcessorSet::new(vec![Box::new(TableProcessor::new())]),
            Format::All => ProcessorSet::new(vec![
                Box::new(LineTabProcessor::new()),
                Box::new(TableProcessor::new()),
            ]),
        }
    }
}

/// Pick the root to load: explicit flag first, configured text root
/// otherwise.
pub fn resolve_root(explicit: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    explicit.unwrap_or_else(|| config.paths.text_root.clone())
}

/// Pick the archive order: the `--sorted-archives` flag overrides the
/// configured default.
pub fn resolve_archive_order(sorted_flag: bool, config: &ConfigFile) -> ArchiveOrder {
    if sorted_flag {
        ArchiveOrder::SortedByName
    } else {
        config.loading.archive_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_root_wins() {
        let config = ConfigFile::default();
        let explicit = PathBuf::from("/tmp/somewhere");
        assert_eq!(resolve_root(Some(explicit.clone()), &config), explicit);
        assert_eq!(resolve_root(None, &config), config.paths.text_root);
    }

    #[test]
    fn test_sorted_flag_overrides_config() {
        let mut config = ConfigFile::default();
        config.loading.archive_order = ArchiveOrder::Physical;
        assert_eq!(
            resolve_archive_order(true, &config),
            ArchiveOrder::SortedByName
        );
        assert_eq!(
            resolve_archive_order(false, &config),
            ArchiveOrder::Physical
        );
    }

    #[test]
    fn test_format_processor_sets_accept_expected_extensions() {
        assert!(Format::Txt.processor_set().find("a.txt").is_some());
        assert!(Format::Txt.processor_set().find("a.csv").is_none());
        assert!(Format::Csv.processor_set().find("a.csv").is_some());
        assert!(Format::All.processor_set().find("a.txt").is_some());
        assert!(Format::All.processor_set().find("a.csv").is_some());
    }
}
