//! Error types for the trust store.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during trust store operations.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid passphrase or corrupt backup")]
    InvalidPassphraseOrCorruptBackup,

    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("Secure storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Audit chain broken at record {index}: {reason}")]
    ChainIntegrity { index: usize, reason: String },

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Malformed env file {path}:{line}: {reason}")]
    MalformedEnvLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by front ends when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    CryptoAuthentication,
    BackendUnavailable,
    ChainIntegrity,
    Storage,
}

impl SecretError {
    /// Taxonomy kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::MissingSecret(_) => ErrorKind::NotFound,
            Self::Validation(_) | Self::MalformedEnvLine { .. } => ErrorKind::Validation,
            Self::InvalidPassphraseOrCorruptBackup | Self::SignatureMismatch(_) => {
                ErrorKind::CryptoAuthentication
            }
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::ChainIntegrity { .. } => ErrorKind::ChainIntegrity,
            Self::Keyring(_) | Self::Crypto(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Storage,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::Validation => "ValidationError",
            Self::CryptoAuthentication => "CryptoAuthenticationError",
            Self::BackendUnavailable => "BackendUnavailable",
            Self::ChainIntegrity => "ChainIntegrityError",
            Self::Storage => "StorageError",
        };
        f.write_str(name)
    }
}

/// Convenience result alias for trust store operations.
pub type Result<T> = std::result::Result<T, SecretError>;
