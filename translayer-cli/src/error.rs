//! CLI error type.

use std::fmt;

/// Errors surfaced to the user as a one-line message and a non-zero exit
/// code.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be read, written, or parsed.
    Config(String),
    /// A load pass could not be carried out.
    Load(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration: {msg}"),
            CliError::Load(msg) => write!(f, "load: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}
