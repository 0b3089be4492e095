//! Secret management commands.
//!
//! Provides `gnoman secrets get|set|delete|list|rotate|report`.

use anyhow::bail;
use chrono::Duration;
use clap::Args;
use gnoman_core::Config;
use gnoman_secrets::store::redact_preview;
use gnoman_secrets::{GetOptions, Prompter};

use crate::context::AppContext;
use crate::prompt::TerminalPrompter;
use crate::render;

/// Secrets command arguments.
#[derive(Args)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(clap::Subcommand)]
pub enum SecretsCommand {
    /// Resolve a secret and print its value
    Get {
        key: String,

        /// Prompt for the value when no source holds it
        #[arg(long)]
        prompt: bool,

        /// Value to print when no source holds the key
        #[arg(long)]
        default: Option<String>,
    },

    /// Store a secret (prompts for hidden input when --value is omitted)
    Set {
        key: String,

        #[arg(long)]
        value: Option<String>,

        /// Write only to the adapter, leaving the env files untouched
        #[arg(long)]
        no_env: bool,
    },

    /// Remove a secret from every source
    Delete { key: String },

    /// List known keys and where they live
    List,

    /// Replace secrets with fresh random values
    Rotate {
        /// Keys to rotate; all known keys when omitted
        keys: Vec<String>,

        /// Random bytes per value
        #[arg(long, default_value_t = 32)]
        length: usize,
    },

    /// Report duplicates, missing keys and stale entries
    Report {
        /// Staleness threshold in days (defaults to the configured value)
        #[arg(long)]
        stale_days: Option<u32>,

        #[arg(long)]
        json: bool,
    },
}

/// Run the secrets command.
pub fn run(args: SecretsArgs, config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::open(config)?;
    let store = &ctx.store;

    match args.command {
        SecretsCommand::Get {
            key,
            prompt,
            default,
        } => {
            let mut options = GetOptions::new().prompt_on_miss(prompt);
            if let Some(default) = default {
                options = options.default_value(default);
            }
            let value = store.require(&key, &options)?;
            println!("{value}");
        }

        SecretsCommand::Set { key, value, no_env } => {
            let value = match value {
                Some(v) => v,
                None => match TerminalPrompter.prompt(&format!("Enter value for '{key}'"), true)? {
                    Some(v) => v.expose_secret().to_string(),
                    None => bail!("Secret value must not be empty"),
                },
            };
            store.set(&key, &value, !no_env)?;
            println!("Secret '{key}' stored ({}).", redact_preview(value.trim()));
        }

        SecretsCommand::Delete { key } => {
            store.delete(&key)?;
            println!("Secret '{key}' deleted.");
        }

        SecretsCommand::List => {
            let snapshot = store.snapshot()?;
            if snapshot.is_empty() {
                println!("No secrets stored.");
                return Ok(());
            }
            println!("{:<32} {:<28} MODIFIED", "KEY", "SOURCES");
            println!("{}", "-".repeat(84));
            for (key, values) in &snapshot {
                let sources: Vec<&str> = values.keys().map(|s| s.as_str()).collect();
                let modified = store
                    .metadata(key)
                    .and_then(|m| m.modified)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<32} {:<28} {}", key, sources.join(","), modified);
            }
            println!("\n{} secret(s) total.", snapshot.len());
        }

        SecretsCommand::Rotate { keys, length } => {
            let requested = (!keys.is_empty()).then_some(keys.as_slice());
            let count = store.rotate(requested, length)?;
            println!("Rotated {count} secret(s).");
        }

        SecretsCommand::Report { stale_days, json } => {
            let days = stale_days.unwrap_or(ctx.config.audit.stale_after_days);
            let report = store.health_report(Duration::days(i64::from(days)))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{} entries in the {} adapter\n", report.total, ctx.adapter_kind);
            if report.duplicates.is_empty() {
                render::ok("No duplicate entries");
            }
            for label in &report.duplicates {
                render::fail(format!("Duplicate entry: {label}"));
            }
            for namespace in &report.missing_keys {
                render::fail(format!("Entry without a key in namespace '{namespace}'"));
            }
            if report.stale.is_empty() {
                render::ok(format!("Nothing older than {days} days"));
            }
            for label in &report.stale {
                render::warn(format!("Stale (> {days} days): {label}"));
            }
        }
    }

    Ok(())
}
