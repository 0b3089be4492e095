//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failures loading, validating or saving `gnoman.json5`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("JSON5 parse error: {0}")]
    Json5(String),

    #[error("Could not serialize configuration: {0}")]
    Serialize(String),

    /// Every problem found by [`crate::Config::validate`].
    #[error("Invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Individual validation problems; empty for other variants.
    pub fn problems(&self) -> &[String] {
        match self {
            Self::Validation(problems) => problems,
            _ => &[],
        }
    }
}
