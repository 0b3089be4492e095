//! Platform adapter inspection.

use clap::Args;
use gnoman_core::Config;

use crate::context::AppContext;
use crate::render;

/// Keyring command arguments.
#[derive(Args)]
pub struct KeyringArgs {
    #[command(subcommand)]
    pub command: KeyringCommand,
}

#[derive(clap::Subcommand)]
pub enum KeyringCommand {
    /// List adapter entries across every namespace (names only)
    List,

    /// Show which adapter is in use and why
    Backend,

    /// Rebuild the metadata index from the adapter's entries
    Reindex,
}

/// Run the keyring command.
pub fn run(args: KeyringArgs, config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::open(config)?;

    match args.command {
        KeyringCommand::List => {
            let entries = ctx.store.adapter().list_entries()?;
            if entries.is_empty() {
                println!("No entries in the {} adapter.", ctx.adapter_kind);
                return Ok(());
            }
            println!("{:<24} KEY", "NAMESPACE");
            println!("{}", "-".repeat(56));
            for entry in &entries {
                println!("{:<24} {}", entry.namespace, entry.key);
            }
            println!("\n{} entr(ies) total.", entries.len());
        }

        KeyringCommand::Backend => {
            println!("Configured: {}", ctx.config.keyring.backend);
            match &ctx.fallback_reason {
                None => render::ok(format!("Using the {} adapter", ctx.adapter_kind)),
                Some(reason) => {
                    render::warn(format!("Using the {} adapter", ctx.adapter_kind));
                    println!("    native store unavailable: {reason}");
                }
            }
            println!("Namespace:  {}", ctx.store.namespace());
            println!("Ledger:     {}", ctx.store.ledger().path().display());
            if ctx.store.adapter().stores_plaintext() {
                render::warn("File adapter values are not encrypted (GNOMAN_MASTER_KEY unset)");
            }
        }

        KeyringCommand::Reindex => {
            let count = ctx.store.reindex()?;
            render::ok(format!("Metadata index rebuilt with {count} entr(ies)"));
        }
    }

    Ok(())
}
