//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Interpret a flag value. `1`, `true`, `yes` and `on` are truthy.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Environment variable names recognised by GNOMAN.
pub mod vars {
    /// State directory override (defaults to `~/.gnoman`).
    pub const GNOMAN_STATE_DIR: &str = "GNOMAN_STATE_DIR";

    /// Legacy alias for the state directory override.
    pub const GNOMAN_HOME: &str = "GNOMAN_HOME";

    /// Config file override.
    pub const GNOMAN_CONFIG: &str = "GNOMAN_CONFIG";

    /// Namespace under which secrets are stored in the adapter.
    pub const GNOMAN_KEYRING_SERVICE: &str = "GNOMAN_KEYRING_SERVICE";

    /// Adapter override: `auto`, `native`, `file` or `memory`.
    pub const GNOMAN_KEYRING_BACKEND: &str = "GNOMAN_KEYRING_BACKEND";

    /// Location of the encrypted-file fallback store.
    pub const GNOMAN_KEYRING_PATH: &str = "GNOMAN_KEYRING_PATH";

    /// Hex-encoded 32-byte key sealing values in the file adapter.
    pub const GNOMAN_MASTER_KEY: &str = "GNOMAN_MASTER_KEY";

    /// Base64 Ed25519 private key used to sign the audit ledger.
    pub const GNOMAN_AUDIT_KEY: &str = "GNOMAN_AUDIT_KEY";

    /// Log filter directive.
    pub const GNOMAN_LOG: &str = "GNOMAN_LOG";

    /// Emit JSON log lines when truthy.
    pub const GNOMAN_LOG_JSON: &str = "GNOMAN_LOG_JSON";

    /// Days after which an untouched secret is reported stale.
    pub const GNOMAN_STALE_AFTER_DAYS: &str = "GNOMAN_STALE_AFTER_DAYS";
}
