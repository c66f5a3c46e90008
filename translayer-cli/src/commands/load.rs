//! `translayer load`: run one load pass and report what was merged.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use translayer::loader::AsyncLoader;
use translayer::ConfigFile;

use crate::commands::common::{resolve_archive_order, resolve_root, Format};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory to load (defaults to the configured text root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Source formats to accept
    #[arg(long, value_enum, default_value_t = Format::All)]
    pub format: Format,

    /// Process archive members in sorted name order instead of the
    /// configured default
    #[arg(long)]
    pub sorted_archives: bool,
}

pub fn run(args: LoadArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    let root = resolve_root(args.root, &config);
    let order = resolve_archive_order(args.sorted_archives, &config);

    println!("Loading translations from: {}", root.display());

    let progress = ProgressBar::new(0).with_style(ProgressStyle::default_bar());
    let progress_view = progress.clone();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let mut loader = AsyncLoader::new(
        "cli",
        &root,
        args.format.processor_set(),
        move |_, completed, total| {
            if progress_view.length() != Some(total as u64) {
                progress_view.set_length(total as u64);
            }
            progress_view.set_position(completed as u64);
        },
        move |result| {
            let _ = tx.lock().unwrap().send(result);
        },
    )
    .with_archive_order(order);

    // Ctrl-C cancels cooperatively: the pass still completes and reports
    // whatever it merged before the signal.
    let cancel = loader.cancel_handle();
    let cancel_status = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    loader.start();
    let result = rx
        .recv()
        .map_err(|_| CliError::Load("loader finished without a result".to_string()))?;
    loader.wait();
    progress.finish_and_clear();

    println!(
        "Loaded {} entries ({} regex rules) from {} files in {} ms",
        result.total_entries,
        result.regex_rules.len(),
        result.total_files,
        result.elapsed_ms
    );
    if cancel_status.is_cancelled() {
        println!("(cancelled early; counts cover the files processed before the signal)");
    }
    Ok(())
}
