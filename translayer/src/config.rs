//! User configuration.
//!
//! Settings live in an INI file under the platform config directory
//! (`~/.config/translayer/config.ini` on Linux). Every setting has a
//! default, a missing file simply means "all defaults", and the CLI's
//! `config` commands go through the string-keyed [`ConfigKey`] surface so
//! they never need to know the concrete field types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::export::DEFAULT_FLUSH_THRESHOLD;
use crate::loader::ArchiveOrder;

/// Default capacity of the decoded-image cache.
pub const DEFAULT_TEXTURE_CAPACITY: usize = 30;

/// Errors from reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("failed to read config: {0}")]
    Ini(#[from] ini::Error),

    /// The file could not be written.
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),

    /// `set` was called with a value the key cannot hold.
    #[error("invalid value '{value}' for key '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Where the config file lives.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("translayer")
        .join("config.ini")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("translayer")
}

/// `[paths]`: where translation sources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSection {
    /// Root for free-text sources (`.txt`, `.zip`).
    pub text_root: PathBuf,
    /// Root for UI-term sources (`.csv`, `.zip`).
    pub terms_root: PathBuf,
    /// Root for replacement images (`.png`).
    pub textures_root: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        let data = default_data_dir();
        Self {
            text_root: data.join("text"),
            terms_root: data.join("terms"),
            textures_root: data.join("textures"),
        }
    }
}

/// `[loading]`: loader behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingSection {
    /// Archive member order; `physical` streams, `sorted` indexes first.
    pub archive_order: ArchiveOrder,
}

/// `[resolver]`: resolution behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSection {
    /// Tag resolved output with the engine marker.
    pub mark_resolved: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            mark_resolved: true,
        }
    }
}

/// `[cache]`: derived-asset cache sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSection {
    /// Decoded images kept in memory.
    pub texture_capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            texture_capacity: DEFAULT_TEXTURE_CAPACITY,
        }
    }
}

/// `[export]`: untranslated key dumping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSection {
    /// Whether misses are recorded at all.
    pub enabled: bool,
    /// File the sink appends to.
    pub file: PathBuf,
    /// Buffered records per flush.
    pub flush_threshold: usize,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            enabled: false,
            file: default_data_dir().join("untranslated.csv"),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub loading: LoadingSection,
    pub resolver: ResolverSection,
    pub cache: CacheSection,
    pub export: ExportSection,
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("paths")) {
            if let Some(v) = section.get("text_root") {
                config.paths.text_root = PathBuf::from(v);
            }
            if let Some(v) = section.get("terms_root") {
                config.paths.terms_root = PathBuf::from(v);
            }
            if let Some(v) = section.get("textures_root") {
                config.paths.textures_root = PathBuf::from(v);
            }
        }
        if let Some(section) = ini.section(Some("loading")) {
            if let Some(v) = section.get("archive_order") {
                config.loading.archive_order = parse_archive_order(v).unwrap_or_default();
            }
        }
        if let Some(section) = ini.section(Some("resolver")) {
            if let Some(v) = section.get("mark_resolved") {
                config.resolver.mark_resolved = v.parse().unwrap_or(true);
            }
        }
        if let Some(section) = ini.section(Some("cache")) {
            if let Some(v) = section.get("texture_capacity") {
                config.cache.texture_capacity =
                    v.parse().unwrap_or(DEFAULT_TEXTURE_CAPACITY).max(1);
            }
        }
        if let Some(section) = ini.section(Some("export")) {
            if let Some(v) = section.get("enabled") {
                config.export.enabled = v.parse().unwrap_or(false);
            }
            if let Some(v) = section.get("file") {
                config.export.file = PathBuf::from(v);
            }
            if let Some(v) = section.get("flush_threshold") {
                config.export.flush_threshold =
                    v.parse().unwrap_or(DEFAULT_FLUSH_THRESHOLD).max(1);
            }
        }

        Ok(config)
    }

    /// Save to the default location, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("text_root", self.paths.text_root.display().to_string())
            .set("terms_root", self.paths.terms_root.display().to_string())
            .set(
                "textures_root",
                self.paths.textures_root.display().to_string(),
            );
        ini.with_section(Some("loading")).set(
            "archive_order",
            archive_order_name(self.loading.archive_order),
        );
        ini.with_section(Some("resolver"))
            .set("mark_resolved", self.resolver.mark_resolved.to_string());
        ini.with_section(Some("cache"))
            .set("texture_capacity", self.cache.texture_capacity.to_string());
        ini.with_section(Some("export"))
            .set("enabled", self.export.enabled.to_string())
            .set("file", self.export.file.display().to_string())
            .set(
                "flush_threshold",
                self.export.flush_threshold.to_string(),
            );

        ini.write_to_file(path)?;
        Ok(())
    }
}

fn parse_archive_order(value: &str) -> Option<ArchiveOrder> {
    match value.trim().to_ascii_lowercase().as_str() {
        "physical" | "streaming" => Some(ArchiveOrder::Physical),
        "sorted" | "sorted_by_name" => Some(ArchiveOrder::SortedByName),
        _ => None,
    }
}

fn archive_order_name(order: ArchiveOrder) -> &'static str {
    match order {
        ArchiveOrder::Physical => "physical",
        ArchiveOrder::SortedByName => "sorted",
    }
}

/// A settable configuration key in `section.key` form, for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    TextRoot,
    TermsRoot,
    TexturesRoot,
    ArchiveOrder,
    MarkResolved,
    TextureCapacity,
    ExportEnabled,
    ExportFile,
    ExportFlushThreshold,
}

impl ConfigKey {
    /// Every key, in display order.
    pub const ALL: &'static [ConfigKey] = &[
        ConfigKey::TextRoot,
        ConfigKey::TermsRoot,
        ConfigKey::TexturesRoot,
        ConfigKey::ArchiveOrder,
        ConfigKey::MarkResolved,
        ConfigKey::TextureCapacity,
        ConfigKey::ExportEnabled,
        ConfigKey::ExportFile,
        ConfigKey::ExportFlushThreshold,
    ];

    /// The `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::TextRoot => "paths.text_root",
            ConfigKey::TermsRoot => "paths.terms_root",
            ConfigKey::TexturesRoot => "paths.textures_root",
            ConfigKey::ArchiveOrder => "loading.archive_order",
            ConfigKey::MarkResolved => "resolver.mark_resolved",
            ConfigKey::TextureCapacity => "cache.texture_capacity",
            ConfigKey::ExportEnabled => "export.enabled",
            ConfigKey::ExportFile => "export.file",
            ConfigKey::ExportFlushThreshold => "export.flush_threshold",
        }
    }

    /// Read this key's current value as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::TextRoot => config.paths.text_root.display().to_string(),
            ConfigKey::TermsRoot => config.paths.terms_root.display().to_string(),
            ConfigKey::TexturesRoot => config.paths.textures_root.display().to_string(),
            ConfigKey::ArchiveOrder => {
                archive_order_name(config.loading.archive_order).to_string()
            }
            ConfigKey::MarkResolved => config.resolver.mark_resolved.to_string(),
            ConfigKey::TextureCapacity => config.cache.texture_capacity.to_string(),
            ConfigKey::ExportEnabled => config.export.enabled.to_string(),
            ConfigKey::ExportFile => config.export.file.display().to_string(),
            ConfigKey::ExportFlushThreshold => config.export.flush_threshold.to_string(),
        }
    }

    /// Write a string value into this key, validating it first.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
        };
        match self {
            ConfigKey::TextRoot => config.paths.text_root = PathBuf::from(value),
            ConfigKey::TermsRoot => config.paths.terms_root = PathBuf::from(value),
            ConfigKey::TexturesRoot => config.paths.textures_root = PathBuf::from(value),
            ConfigKey::ArchiveOrder => {
                config.loading.archive_order = parse_archive_order(value).ok_or_else(invalid)?;
            }
            ConfigKey::MarkResolved => {
                config.resolver.mark_resolved = value.parse().map_err(|_| invalid())?;
            }
            ConfigKey::TextureCapacity => {
                let capacity: usize = value.parse().map_err(|_| invalid())?;
                if capacity == 0 {
                    return Err(invalid());
                }
                config.cache.texture_capacity = capacity;
            }
            ConfigKey::ExportEnabled => {
                config.export.enabled = value.parse().map_err(|_| invalid())?;
            }
            ConfigKey::ExportFile => config.export.file = PathBuf::from(value),
            ConfigKey::ExportFlushThreshold => {
                let threshold: usize = value.parse().map_err(|_| invalid())?;
                if threshold == 0 {
                    return Err(invalid());
                }
                config.export.flush_threshold = threshold;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
