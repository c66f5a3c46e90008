//! Translayer CLI - Command-line interface
//!
//! Thin front end over the `translayer` library: run load passes, resolve
//! keys from the shell, and manage configuration.

mod commands;
mod error;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "translayer", version, about = "Community translation overlays, loaded on demand")]
struct Cli {
    /// Default log filter; the RUST_LOG environment variable overrides it.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a translation directory and report what was merged
    Load(commands::load::LoadArgs),

    /// Load a translation directory, then resolve keys against it
    Resolve(commands::resolve::ResolveArgs),

    /// Inspect replacement images
    Textures {
        #[command(subcommand)]
        action: commands::textures::TexturesAction,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let _guard = translayer::logging::init(&cli.log, None);

    let result = match cli.command {
        Command::Load(args) => commands::load::run(args),
        Command::Resolve(args) => commands::resolve::run(args),
        Command::Textures { action } => commands::textures::run(action),
        Command::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
