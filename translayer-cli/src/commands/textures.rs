//! Replacement-image CLI commands.

use clap::Subcommand;
use translayer::{ConfigFile, TextureCache};

use crate::error::CliError;

/// Texture action subcommands.
#[derive(Debug, Subcommand)]
pub enum TexturesAction {
    /// Scan the configured textures directory and show what is indexed
    Stats,
    /// Decode one replacement image by sprite name and report its size
    Probe {
        /// Sprite name (file name without extension)
        name: String,
    },
}

/// Run a textures subcommand.
pub fn run(action: TexturesAction) -> Result<(), CliError> {
    let config = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    let mut cache = TextureCache::new(config.cache.texture_capacity);
    let indexed = cache.scan(&config.paths.textures_root);

    match action {
        TexturesAction::Stats => {
            println!("Textures directory: {}", config.paths.textures_root.display());
            println!("  Indexed images: {indexed}");
            println!("  Cache capacity: {}", config.cache.texture_capacity);
            Ok(())
        }
        TexturesAction::Probe { name } => match cache.get(&name) {
            Some(image) => {
                println!("{name}: {}x{} ({} bytes RGBA)", image.width, image.height,
                    image.rgba.len());
                Ok(())
            }
            None => Err(CliError::Load(format!(
                "no replacement image named '{name}' under {}",
                config.paths.textures_root.display()
            ))),
        },
    }
}
