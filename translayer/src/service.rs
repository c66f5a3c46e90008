//! Per-domain assembly of loader and resolver.
//!
//! A [`TranslationService`] owns everything one text domain needs: the
//! background loader for its directory, the resolver its lookups go
//! through, and (optionally) the untranslated-export sink. The completion
//! callback is wired to [`Resolver::install`], so a finished pass becomes
//! visible to readers in one atomic swap, and shared [`LoadState`] atomics
//! let hosts poll progress without touching the worker.
//!
//! Several services coexist without shared state; a free-text domain and
//! a UI-term domain typically run side by side with different processor
//! sets:
//!
//! ```no_run
//! use translayer::loader::{LineTabProcessor, ProcessorSet, TableProcessor};
//! use translayer::service::{ServiceConfig, TranslationService};
//!
//! let mut text = TranslationService::new(
//!     ServiceConfig::new("free-text", "translations/text"),
//!     ProcessorSet::new(vec![Box::new(LineTabProcessor::new())]),
//! );
//! let mut terms = TranslationService::new(
//!     ServiceConfig::new("ui-terms", "translations/terms"),
//!     ProcessorSet::new(vec![Box::new(TableProcessor::new())]),
//! );
//! text.start_load();
//! terms.start_load();
//!
//! // Lookups work immediately, against whatever snapshot is published.
//! if let Some(substitute) = terms.resolver().resolve("SceneDaily/ボタン文字") {
//!     println!("{substitute}");
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::export::UntranslatedSink;
use crate::loader::{ArchiveOrder, AsyncLoader, CancelHandle, ProcessorSet};
use crate::resolve::Resolver;

/// Configuration for one translation domain.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Short label used in log lines.
    pub name: String,
    /// Directory the loader watches over.
    pub root: PathBuf,
    /// Member order when expanding archives.
    pub archive_order: ArchiveOrder,
    /// Whether resolved output is marker-tagged.
    pub mark_resolved: bool,
    /// Untranslated export, if enabled.
    pub export: Option<ExportConfig>,
}

/// Untranslated-export settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// CSV file the sink appends to.
    pub path: PathBuf,
    /// Buffered records per flush.
    pub flush_threshold: usize,
}

impl ServiceConfig {
    /// Config with defaults: physical archive order, marking on, no
    /// export.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            archive_order: ArchiveOrder::default(),
            mark_resolved: true,
            export: None,
        }
    }

    /// Select the archive member order.
    pub fn with_archive_order(mut self, order: ArchiveOrder) -> Self {
        self.archive_order = order;
        self
    }

    /// Enable or disable output marking.
    pub fn with_marking(mut self, mark_resolved: bool) -> Self {
        self.mark_resolved = mark_resolved;
        self
    }

    /// Enable untranslated export.
    pub fn with_export(mut self, path: impl Into<PathBuf>, flush_threshold: usize) -> Self {
        self.export = Some(ExportConfig {
            path: path.into(),
            flush_threshold,
        });
        self
    }

    /// Domain config for the free-text root described by a user config.
    pub fn for_text_domain(config: &crate::config::ConfigFile) -> Self {
        Self::from_user_config("free-text", config.paths.text_root.clone(), config)
    }

    /// Domain config for the UI-term root described by a user config.
    pub fn for_terms_domain(config: &crate::config::ConfigFile) -> Self {
        Self::from_user_config("ui-terms", config.paths.terms_root.clone(), config)
    }

    fn from_user_config(
        name: &str,
        root: PathBuf,
        config: &crate::config::ConfigFile,
    ) -> Self {
        let mut service_config = Self::new(name, root)
            .with_archive_order(config.loading.archive_order)
            .with_marking(config.resolver.mark_resolved);
        if config.export.enabled {
            service_config = service_config
                .with_export(&config.export.file, config.export.flush_threshold);
        }
        service_config
    }
}

/// Shared, lock-free view of a load pass for polling hosts.
///
/// Fractions are stored in thousandths so the whole struct stays atomic.
#[derive(Debug, Default)]
pub struct LoadState {
    loading: AtomicBool,
    progress_millis: AtomicU32,
    completed_units: AtomicU32,
    total_units: AtomicU32,
}

impl LoadState {
    /// True while a pass is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    /// Progress of the current (or last) pass in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        self.progress_millis.load(Ordering::Relaxed) as f32 / 1000.0
    }

    /// Units processed so far.
    pub fn completed_units(&self) -> u32 {
        self.completed_units.load(Ordering::Relaxed)
    }

    /// Units discovered for the pass.
    pub fn total_units(&self) -> u32 {
        self.total_units.load(Ordering::Relaxed)
    }
}

/// One translation domain: loader + resolver (+ sink), wired together.
pub struct TranslationService {
    resolver: Arc<Resolver>,
    state: Arc<LoadState>,
    sink: Option<Arc<Mutex<UntranslatedSink>>>,
    loader: AsyncLoader,
}

impl TranslationService {
    /// Assemble a domain from its config and processor set.
    pub fn new(config: ServiceConfig, processors: ProcessorSet) -> Self {
        let sink = config.export.as_ref().map(|export| {
            Arc::new(Mutex::new(
                UntranslatedSink::new(&export.path).with_flush_threshold(export.flush_threshold),
            ))
        });

        let mut resolver = Resolver::new().with_marking(config.mark_resolved);
        if let Some(sink) = &sink {
            resolver = resolver.with_sink(Arc::clone(sink));
        }
        let resolver = Arc::new(resolver);
        let state = Arc::new(LoadState::default());

        let progress_state = Arc::clone(&state);
        let completion_state = Arc::clone(&state);
        let completion_resolver = Arc::clone(&resolver);
        let loader = AsyncLoader::new(
            config.name,
            config.root,
            processors,
            move |fraction, completed, total| {
                progress_state
                    .progress_millis
                    .store((fraction * 1000.0) as u32, Ordering::Relaxed);
                progress_state
                    .completed_units
                    .store(completed, Ordering::Relaxed);
                progress_state.total_units.store(total, Ordering::Relaxed);
            },
            move |result| {
                completion_resolver.install(result);
                completion_state
                    .progress_millis
                    .store(1000, Ordering::Relaxed);
                completion_state.loading.store(false, Ordering::Relaxed);
            },
        )
        .with_archive_order(config.archive_order);

        Self {
            resolver,
            state,
            sink,
            loader,
        }
    }

    /// The domain's resolver; clone the `Arc` into whatever glue needs
    /// lookups.
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// The shared load state for polling.
    pub fn state(&self) -> &Arc<LoadState> {
        &self.state
    }

    /// Begin a background load pass. Non-blocking; a no-op (with a
    /// warning) if one is already in flight.
    pub fn start_load(&mut self) {
        if self.loader.is_running() {
            // Let the loader log the duplicate start; the live pass keeps
            // its progress state.
            self.loader.start();
            return;
        }
        self.state.loading.store(true, Ordering::Relaxed);
        self.state.progress_millis.store(0, Ordering::Relaxed);
        self.state.completed_units.store(0, Ordering::Relaxed);
        self.state.total_units.store(0, Ordering::Relaxed);
        self.loader.start();
    }

    /// Request cancellation of the in-flight pass.
    pub fn cancel(&self) {
        self.loader.cancel();
    }

    /// A cloneable cancel handle for signal handlers.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.loader.cancel_handle()
    }

    /// Block until the in-flight pass finishes. For CLI front ends and
    /// tests; hosts should poll [`LoadState`] instead.
    pub fn wait(&mut self) {
        self.loader.wait();
    }

    /// Flush the untranslated sink now instead of waiting for teardown.
    pub fn flush_export(&self) {
        if let Some(sink) = &self.sink {
            sink.lock().flush();
        }
    }
}

impl Drop for TranslationService {
    fn drop(&mut self) {
        // Stop feeding a snapshot nobody will read; the sink flushes
        // itself when its last Arc drops.
        self.loader.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::loader::{LineTabProcessor, TableProcessor};

    fn text_processors() -> ProcessorSet {
        ProcessorSet::new(vec![Box::new(LineTabProcessor::new())])
    }

    #[test]
    fn test_load_publishes_to_resolver() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\tworld\n").unwrap();

        let mut service = TranslationService::new(
            ServiceConfig::new("test", dir.path()).with_marking(false),
            text_processors(),
        );
        service.start_load();
        service.wait();

        assert_eq!(service.resolver().resolve("hello").as_deref(), Some("world"));
        assert!(!service.state().is_loading());
        assert_eq!(service.state().fraction(), 1.0);
        assert_eq!(service.state().completed_units(), 1);
    }

    #[test]
    fn test_lookups_work_before_first_load() {
        let dir = TempDir::new().unwrap();
        let service = TranslationService::new(
            ServiceConfig::new("test", dir.path()),
            text_processors(),
        );
        assert_eq!(service.resolver().resolve("anything"), None);
    }

    #[test]
    fn test_two_domains_are_independent() {
        let dir = TempDir::new().unwrap();
        let text_root = dir.path().join("text");
        let term_root = dir.path().join("terms");
        fs::create_dir_all(&text_root).unwrap();
        fs::create_dir_all(&term_root).unwrap();
        fs::write(text_root.join("a.txt"), "key\tfrom text\n").unwrap();
        fs::write(
            term_root.join("a.csv"),
            "Term,Original,Translation\nkey,k,from terms\n",
        )
        .unwrap();

        let mut text = TranslationService::new(
            ServiceConfig::new("text", &text_root).with_marking(false),
            text_processors(),
        );
        let mut terms = TranslationService::new(
            ServiceConfig::new("terms", &term_root).with_marking(false),
            ProcessorSet::new(vec![Box::new(TableProcessor::new())]),
        );
        text.start_load();
        terms.start_load();
        text.wait();
        terms.wait();

        assert_eq!(text.resolver().resolve("key").as_deref(), Some("from text"));
        assert_eq!(terms.resolver().resolve("key").as_deref(), Some("from terms"));
    }

    #[test]
    fn test_domain_configs_follow_user_config() {
        let mut user = crate::config::ConfigFile::default();
        user.resolver.mark_resolved = false;
        user.export.enabled = true;
        user.export.flush_threshold = 3;

        let text = ServiceConfig::for_text_domain(&user);
        assert_eq!(text.name, "free-text");
        assert_eq!(text.root, user.paths.text_root);
        assert!(!text.mark_resolved);
        assert_eq!(text.export.as_ref().unwrap().flush_threshold, 3);

        let terms = ServiceConfig::for_terms_domain(&user);
        assert_eq!(terms.root, user.paths.terms_root);
    }

    #[test]
    fn test_misses_reach_export_sink() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump.csv");
        fs::create_dir_all(dir.path().join("root")).unwrap();

        let mut service = TranslationService::new(
            ServiceConfig::new("test", dir.path().join("root")).with_export(&dump, 1),
            text_processors(),
        );
        service.start_load();
        service.wait();

        assert_eq!(service.resolver().resolve("UI/Missing"), None);
        service.flush_export();

        let contents = fs::read_to_string(&dump).unwrap();
        assert!(contents.contains("UI/Missing"));
    }
}
