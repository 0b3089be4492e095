//! Terminal rendering utilities.
//!
//! Status lines, error reports and ledger rows. Nothing here ever receives a
//! cleartext secret; values shown to the user go through
//! [`gnoman_secrets::store::redact_preview`] first.

use chrono::{DateTime, SecondsFormat};
use console::{style, Emoji};
use gnoman_core::ConfigError;
use gnoman_secrets::{AuditRecord, SecretError};

static CHECK: Emoji = Emoji("✓", "+");
static CROSS: Emoji = Emoji("✗", "x");
static WARN: Emoji = Emoji("⚠", "!");

pub fn ok(message: impl AsRef<str>) {
    println!("  {} {}", style(CHECK).green(), message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    println!("  {} {}", style(WARN).yellow(), message.as_ref());
}

pub fn fail(message: impl AsRef<str>) {
    println!("  {} {}", style(CROSS).red(), message.as_ref());
}

/// One-line error report: taxonomy kind, then the message chain.
pub fn error_line(err: &anyhow::Error) -> String {
    format!("{} {err:#}", style(format!("error[{}]:", error_kind(err))).red().bold())
}

/// Taxonomy name of the first classified error in the chain.
pub fn error_kind(err: &anyhow::Error) -> String {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<SecretError>() {
            return e.kind().to_string();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "ConfigError".to_string();
        }
    }
    "Error".to_string()
}

/// `2026-01-01T00:00:00.000000Z  ok  secret_set  {"key":"K"}`
pub fn record_line(record: &AuditRecord) -> String {
    let status = if record.ok {
        style("ok  ").green()
    } else {
        style("FAIL").red()
    };
    format!(
        "{}  {}  {:<16}  {}",
        style(format_timestamp(record.timestamp)).dim(),
        status,
        record.action,
        serde_json::Value::Object(record.params.clone()),
    )
}

/// Ledger timestamps are fractional Unix seconds.
pub fn format_timestamp(timestamp: f64) -> String {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| timestamp.to_string())
}
