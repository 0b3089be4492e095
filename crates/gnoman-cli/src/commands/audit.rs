//! Audit ledger commands.

use clap::Args;
use gnoman_core::Config;

use crate::context::AppContext;
use crate::render;

/// Audit command arguments.
#[derive(Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

#[derive(clap::Subcommand)]
pub enum AuditCommand {
    /// Show the most recent ledger records
    Tail {
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,

        /// Print raw NDJSON records
        #[arg(long)]
        json: bool,
    },

    /// Check every hash, signature and chain link
    Verify,

    /// Print the ledger verification key
    Pubkey,
}

/// Run the audit command.
pub fn run(args: AuditArgs, config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::open(config)?;
    let ledger = ctx.store.ledger();

    match args.command {
        AuditCommand::Tail { lines, json } => {
            for record in ledger.read_tail(lines)? {
                if json {
                    println!("{}", serde_json::to_string(&record)?);
                } else {
                    println!("{}", render::record_line(&record));
                }
            }
        }

        AuditCommand::Verify => {
            let count = ledger.verify_log()?;
            render::ok(format!(
                "{count} record(s) verified in {}",
                ledger.path().display()
            ));
        }

        AuditCommand::Pubkey => {
            println!("{}", ledger.signer().public_key_hex());
        }
    }

    Ok(())
}
