//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main GNOMAN configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// State directory override. Defaults to `~/.gnoman`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Secure-storage adapter settings.
    #[serde(default)]
    pub keyring: KeyringConfig,

    /// Environment file locations.
    #[serde(default)]
    pub env: EnvFilesConfig,

    /// Audit ledger settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Backup encryption settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Adapter namespace reserved for the ledger signing key.
pub const AUDIT_NAMESPACE: &str = "gnoman-audit";

/// Secure-storage adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyringConfig {
    /// Namespace secrets are stored under.
    #[serde(default = "default_service")]
    pub service: String,

    /// Which adapter to use.
    #[serde(default)]
    pub backend: BackendPreference,

    /// Location of the encrypted-file fallback document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            backend: BackendPreference::default(),
            file_path: None,
        }
    }
}

fn default_service() -> String {
    "gnoman".to_string()
}

/// Adapter selection preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Probe the native store, fall back to the file store.
    #[default]
    Auto,
    /// OS keychain / credential manager / secret service.
    Native,
    /// JSON document in the state directory.
    File,
    /// Process memory only.
    Memory,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" | "keyring" => Ok(Self::Native),
            "file" => Ok(Self::File),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown keyring backend '{other}' (expected auto, native, file or memory)"
            )),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::File => "file",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Environment file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvFilesConfig {
    /// Plaintext env file.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// "Secure" env file mirrored alongside the adapter.
    #[serde(default = "default_secure_env_file")]
    pub secure_env_file: Option<PathBuf>,
}

impl Default for EnvFilesConfig {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            secure_env_file: default_secure_env_file(),
        }
    }
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_secure_env_file() -> Option<PathBuf> {
    Some(PathBuf::from(".env.secure"))
}

/// Audit ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Ledger file override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Age in days after which an unrotated secret is reported as stale.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            stale_after_days: default_stale_after_days(),
        }
    }
}

fn default_stale_after_days() -> u32 {
    180
}

/// Backup encryption settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Key derivation used for new backups. Old backups carry their own parameters.
    #[serde(default)]
    pub kdf: KdfConfig,
}

/// Passphrase key-derivation cost settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm")]
pub enum KdfConfig {
    #[serde(rename = "scrypt")]
    Scrypt { log_n: u8, r: u32, p: u32 },

    #[serde(rename = "pbkdf2-hmac-sha256")]
    Pbkdf2 { iterations: u32 },
}

/// Largest accepted scrypt work factor (`N = 2^log_n`).
pub const MAX_SCRYPT_LOG_N: u8 = 20;

/// Ceiling on scrypt memory, `128 * r * N` bytes.
pub const MAX_SCRYPT_MEMORY: u64 = 1 << 30;

/// Ceiling on scrypt `r * p`.
pub const MAX_SCRYPT_RP: u64 = 64;

pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

impl KdfConfig {
    /// Every reason these cost parameters are unusable; empty when they are fine.
    ///
    /// Applied to configuration and to the parameters carried by backups
    /// before any key derivation runs.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match *self {
            KdfConfig::Scrypt { log_n, r, p } => {
                if log_n == 0 || log_n > MAX_SCRYPT_LOG_N {
                    problems.push(format!(
                        "Scrypt log_n must be 1-{MAX_SCRYPT_LOG_N}, got {log_n}"
                    ));
                }
                if r == 0 || p == 0 {
                    problems.push("Scrypt r and p must be greater than 0".to_string());
                } else if u64::from(r) * u64::from(p) > MAX_SCRYPT_RP {
                    problems.push(format!(
                        "Scrypt r * p must be at most {MAX_SCRYPT_RP}, got {}",
                        u64::from(r) * u64::from(p)
                    ));
                }
                if log_n <= MAX_SCRYPT_LOG_N {
                    let memory = 128u64 * u64::from(r) * (1u64 << log_n);
                    if memory > MAX_SCRYPT_MEMORY {
                        problems.push(format!(
                            "Scrypt would need {memory} bytes, limit is {MAX_SCRYPT_MEMORY}"
                        ));
                    }
                }
            }
            KdfConfig::Pbkdf2 { iterations } => {
                if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
                    problems.push(format!(
                        "PBKDF2 iterations must be {MIN_PBKDF2_ITERATIONS}-{MAX_PBKDF2_ITERATIONS}, got {iterations}"
                    ));
                }
            }
        }
        problems
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self::Scrypt {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
