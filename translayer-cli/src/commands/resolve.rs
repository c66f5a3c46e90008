//! `translayer resolve`: load a directory, then resolve keys against it.

use std::path::PathBuf;

use clap::Args;
use translayer::service::{ServiceConfig, TranslationService};
use translayer::ConfigFile;

use crate::commands::common::{resolve_archive_order, resolve_root, Format};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Directory to load (defaults to the configured text root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Source formats to accept
    #[arg(long, value_enum, default_value_t = Format::All)]
    pub format: Format,

    /// Process archive members in sorted name order
    #[arg(long)]
    pub sorted_archives: bool,

    /// Record unresolved keys into this CSV file
    #[arg(long)]
    pub dump_misses: Option<PathBuf>,

    /// Keys to resolve
    #[arg(required = true)]
    pub keys: Vec<String>,
}

pub fn run(args: ResolveArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    let root = resolve_root(args.root, &config);
    let order = resolve_archive_order(args.sorted_archives, &config);

    // Marking is for in-process hosts; shell output stays clean.
    let mut service_config = ServiceConfig::new("cli", &root)
        .with_archive_order(order)
        .with_marking(false);
    if let Some(dump) = &args.dump_misses {
        service_config = service_config.with_export(dump, config.export.flush_threshold);
    }

    let mut service = TranslationService::new(service_config, args.format.processor_set());
    service.start_load();
    service.wait();

    let resolver = service.resolver();
    let mut misses = 0usize;
    for key in &args.keys {
        match resolver.resolve(key) {
            Some(substitute) => println!("{key} => {substitute}"),
            None => {
                misses += 1;
                println!("{key} => (no translation)");
            }
        }
    }
    service.flush_export();

    if misses > 0 {
        if let Some(dump) = &args.dump_misses {
            println!("{misses} unresolved key(s) recorded in {}", dump.display());
        }
    }
    Ok(())
}
