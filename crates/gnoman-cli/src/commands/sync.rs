//! Drift detection and reconciliation commands.

use std::collections::BTreeMap;

use clap::Args;
use gnoman_core::Config;
use gnoman_secrets::store::redact_preview;
use gnoman_secrets::{Source, SyncEngine, SyncState};

use crate::context::AppContext;
use crate::render;

/// Sync command arguments.
#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommand,
}

#[derive(clap::Subcommand)]
pub enum SyncCommand {
    /// Show keys whose values disagree between sources
    Drift,

    /// Propagate the highest-priority value of every key
    Force,

    /// Propagate the value from an explicitly chosen source
    Apply {
        /// KEY=SOURCE pairs, SOURCE being adapter, secure_env or env
        #[arg(value_parser = parse_decision, required = true)]
        decisions: Vec<(String, Source)>,
    },

    /// Per-key sync state
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Replace one key everywhere with a fresh random value
    Rotate { key: String },

    /// Remove one key from every source
    Remove { key: String },
}

fn parse_decision(raw: &str) -> Result<(String, Source), String> {
    let (key, source) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=SOURCE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let source = source.parse::<Source>().map_err(|e| e.to_string())?;
    Ok((key.to_string(), source))
}

/// Run the sync command.
pub fn run(args: SyncArgs, config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::open(config)?;
    let engine = SyncEngine::new(&ctx.store);

    match args.command {
        SyncCommand::Drift => {
            let drift = engine.detect_drift()?;
            if drift.is_empty() {
                render::ok("All sources agree");
                return Ok(());
            }
            for (key, values) in &drift {
                render::warn(key);
                for (source, value) in values {
                    println!("      {:<12} {}", source.as_str(), redact_preview(value));
                }
            }
        }

        SyncCommand::Force => {
            let actions = engine.force_sync()?;
            for action in &actions {
                render::ok(format!("{} <- {}", action.key, action.source));
            }
            println!("{} key(s) reconciled.", actions.len());
        }

        SyncCommand::Apply { decisions } => {
            let requested = decisions.len();
            let decisions: BTreeMap<String, Source> = decisions.into_iter().collect();
            let actions = engine.apply_decisions(&decisions)?;
            for action in &actions {
                render::ok(format!("{} <- {}", action.key, action.source));
            }
            let skipped = requested - actions.len();
            if skipped > 0 {
                render::warn(format!("{skipped} decision(s) named a source without a value"));
            }
        }

        SyncCommand::Status { json } => {
            let status = engine.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }
            for row in &status {
                let sources: Vec<&str> = row.sources.iter().map(|s| s.as_str()).collect();
                let line = format!("{:<32} {}", row.key, sources.join(","));
                match row.state {
                    SyncState::Ok => render::ok(line),
                    SyncState::Drift => render::warn(line),
                }
            }
        }

        SyncCommand::Rotate { key } => {
            let value = engine.rotate_secret(&key)?;
            render::ok(format!("{key} rotated ({})", redact_preview(&value)));
        }

        SyncCommand::Remove { key } => {
            engine.remove_secret(&key)?;
            render::ok(format!("{key} removed from every source"));
        }
    }

    Ok(())
}
