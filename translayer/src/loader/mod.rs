//! Background translation loading.
//!
//! One [`AsyncLoader`] owns one translation root and loads everything under
//! it on a dedicated worker thread: the caller's thread never blocks, and
//! results land in an immutable [`LoadResult`] delivered through the
//! completion callback.
//!
//! # Architecture
//!
//! ```text
//! start() ──► worker thread
//!               │
//!               ├─ enumerate units (root files, then subdirs, ordinal)
//!               │
//!               ├─ per unit:  .txt/.csv ──► FormatProcessor ──► LoadResult
//!               │             .zip ──► ArchiveExpander ──► per member
//!               │             progress callback (completed / total)
//!               │             cancellation check
//!               │
//!               └─ completion callback (LoadResult, exactly once)
//! ```
//!
//! Later units override earlier ones key-by-key, so the deterministic unit
//! order from [`enumerate`] is what makes "load order" a meaningful
//! concept for pack authors.
//!
//! # Example
//!
//! ```no_run
//! use translayer::loader::{AsyncLoader, ProcessorSet, LineTabProcessor};
//!
//! let processors = ProcessorSet::new(vec![Box::new(LineTabProcessor::new())]);
//! let mut loader = AsyncLoader::new(
//!     "free-text",
//!     "translations/text",
//!     processors,
//!     |fraction, done, total| eprintln!("{done}/{total} ({:.0}%)", fraction * 100.0),
//!     |result| println!("{} entries loaded", result.total_entries),
//! );
//! loader.start();
//! // ... the host keeps running; cancel() if the scene changes:
//! loader.cancel();
//! ```

pub mod archive;
pub mod enumerate;
pub mod processor;

pub use archive::{is_unsafe_entry_path, ArchiveError, ArchiveOrder};
pub use processor::{FormatProcessor, LineTabProcessor, ProcessError, ProcessorSet, TableProcessor};

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use regex::Regex;
use tracing::{error, info, warn};

/// One compiled substitution rule from a `$`-prefixed source line.
///
/// Rules are tried in registration order (the order their source lines
/// were processed in), and the first rule producing a non-empty match
/// wins, so earlier packs cannot have their rules reordered by later ones.
#[derive(Debug, Clone)]
pub struct RegexRule {
    /// Pattern matched against the raw key, then the normalized key.
    pub pattern: Regex,
    /// Expansion template; see [`crate::resolve::template`].
    pub template: String,
}

/// The immutable outcome of one load pass.
///
/// Mutated only by the worker thread that builds it; once the completion
/// callback hands it over it is frozen and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    /// Exact-match dictionary, last processed source wins per key.
    pub entries: HashMap<String, String>,
    /// Regex rules in registration order.
    pub regex_rules: Vec<RegexRule>,
    /// Units actually processed (not units found).
    pub total_files: u32,
    /// Entries merged across all processed units.
    pub total_entries: u32,
    /// Wall-clock duration of the pass in milliseconds.
    pub elapsed_ms: u64,
}

/// Fire-and-forget cancellation handle for an [`AsyncLoader`].
///
/// Cloneable and cheap; safe to hand to signal handlers. Setting the flag
/// never blocks; the worker notices at its next unit boundary.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation of the in-flight pass.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Background loader for one translation root.
///
/// `start` spawns a dedicated worker; `cancel` sets a flag the worker
/// checks between units (and between archive members when streaming).
/// A cancelled pass still completes normally with whatever it merged:
/// a smaller result, not an error.
pub struct AsyncLoader {
    name: String,
    root: PathBuf,
    archive_order: ArchiveOrder,
    processors: Arc<ProcessorSet>,
    progress: Arc<dyn Fn(f32, u32, u32) + Send + Sync>,
    completion: Arc<dyn Fn(LoadResult) + Send + Sync>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncLoader {
    /// Create a loader for `root`.
    ///
    /// # Arguments
    ///
    /// * `name` - Short label used in log lines (e.g. `"ui-terms"`).
    /// * `root` - Directory to load; created on first start if missing.
    /// * `processors` - Formats to dispatch to, by extension.
    /// * `progress` - Called once per processed unit with
    ///   `(fraction, completed, total)`.
    /// * `completion` - Called exactly once per `start()`, cancelled or
    ///   not, with the finished [`LoadResult`].
    pub fn new<P, C>(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        processors: ProcessorSet,
        progress: P,
        completion: C,
    ) -> Self
    where
        P: Fn(f32, u32, u32) + Send + Sync + 'static,
        C: Fn(LoadResult) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            root: root.into(),
            archive_order: ArchiveOrder::default(),
            processors: Arc::new(processors),
            progress: Arc::new(progress),
            completion: Arc::new(completion),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Select the member order used when expanding archives.
    pub fn with_archive_order(mut self, order: ArchiveOrder) -> Self {
        self.archive_order = order;
        self
    }

    /// The loader's log label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Begin a load pass on the worker thread.
    ///
    /// Never blocks. If a pass is already in flight this logs a warning
    /// and returns without disturbing it.
    pub fn start(&mut self) {
        if let Some(worker) = &self.worker {
            if !worker.is_finished() {
                warn!(loader = %self.name, "loader already running, ignoring start request");
                return;
            }
        }

        self.cancel.store(false, Ordering::Relaxed);
        let worker = Worker {
            name: self.name.clone(),
            root: self.root.clone(),
            archive_order: self.archive_order,
            processors: Arc::clone(&self.processors),
            progress: Arc::clone(&self.progress),
            completion: Arc::clone(&self.completion),
            cancel: Arc::clone(&self.cancel),
        };

        let spawned = std::thread::Builder::new()
            .name(format!("translayer-load-{}", self.name))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                // The completion contract holds even when the thread
                // cannot be spawned: deliver an empty result inline.
                error!(loader = %self.name, error = %e, "failed to spawn loader thread");
                (self.completion)(LoadResult::default());
            }
        }
    }

    /// Request cancellation of the in-flight pass. Fire-and-forget: the
    /// flag is set and this returns immediately.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// A cloneable handle that cancels this loader; useful for signal
    /// handlers and other `'static` contexts.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// True while a pass is in flight.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Block until the in-flight pass (if any) finishes.
    ///
    /// Hosts normally rely on the completion callback; this exists for
    /// command-line front ends and tests that have nothing better to do
    /// than wait.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(loader = %self.name, "loader thread panicked");
            }
        }
    }
}

/// Everything the worker thread needs, detached from the loader so the
/// loader handle stays usable while the pass runs.
struct Worker {
    name: String,
    root: PathBuf,
    archive_order: ArchiveOrder,
    processors: Arc<ProcessorSet>,
    progress: Arc<dyn Fn(f32, u32, u32) + Send + Sync>,
    completion: Arc<dyn Fn(LoadResult) + Send + Sync>,
    cancel: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let started = Instant::now();
        let mut result = LoadResult::default();
        let mut files_processed = 0u32;

        if self.prepare_root() {
            let extensions = self.processors.accepted_extensions();
            let units = enumerate::collect_units(&self.root, &extensions);
            let total = units.len() as u32;

            if total == 0 {
                info!(loader = %self.name, root = %self.root.display(),
                    "no translation files found");
            } else {
                info!(loader = %self.name, files = total, "loading translation files");
                for unit in units {
                    if self.cancel.load(Ordering::Relaxed) {
                        info!(loader = %self.name, "translation loading cancelled");
                        break;
                    }
                    let added = self.process_unit(&unit, &mut result);
                    result.total_entries += added;
                    files_processed += 1;
                    (self.progress)(
                        files_processed as f32 / total as f32,
                        files_processed,
                        total,
                    );
                }
            }
        }

        result.total_files = files_processed;
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            loader = %self.name,
            entries = result.total_entries,
            files = result.total_files,
            elapsed_ms = result.elapsed_ms,
            "translation loading complete"
        );
        (self.completion)(result);
    }

    /// Make sure the root exists, creating it if needed. Returns whether
    /// there is a directory to load from.
    fn prepare_root(&self) -> bool {
        if self.root.is_dir() {
            return true;
        }
        warn!(loader = %self.name, root = %self.root.display(),
            "translation directory not found, creating");
        match fs::create_dir_all(&self.root) {
            Ok(()) => true,
            Err(e) => {
                error!(loader = %self.name, root = %self.root.display(), error = %e,
                    "failed to create translation directory");
                false
            }
        }
    }

    /// Process one unit, dispatching archives through the expander and
    /// loose files by extension. Failures are confined to the unit: they
    /// are logged, the unit's partial contribution stays merged, and the
    /// returned count is what the unit reported before failing.
    fn process_unit(&self, unit: &Path, result: &mut LoadResult) -> u32 {
        let display_name = unit.file_name().unwrap_or_default().to_string_lossy();

        let is_archive = display_name.to_ascii_lowercase().ends_with(".zip");
        if is_archive {
            return match archive::process_archive(
                unit,
                self.archive_order,
                &self.processors,
                result,
                &self.cancel,
            ) {
                Ok(added) => added,
                Err(e) => {
                    error!(loader = %self.name, unit = %display_name, error = %e,
                        "error processing archive");
                    0
                }
            };
        }

        let Some(processor) = self.processors.find(&display_name) else {
            return 0;
        };
        let mut file = match File::open(unit) {
            Ok(file) => file,
            Err(e) => {
                error!(loader = %self.name, unit = %display_name, error = %e,
                    "error opening translation file");
                return 0;
            }
        };
        match processor.process(&mut file, result) {
            Ok(added) => added,
            Err(e) => {
                error!(loader = %self.name, unit = %display_name, error = %e,
                    "error processing translation file");
                0
            }
        }
    }
}
