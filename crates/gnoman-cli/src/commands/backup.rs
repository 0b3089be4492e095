//! Encrypted backup commands.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use gnoman_core::{paths, Config};
use gnoman_secrets::backup::{self, BackupCodec};

use crate::context::AppContext;
use crate::prompt;

/// Backup command arguments.
#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(clap::Subcommand)]
pub enum BackupCommand {
    /// Write every adapter entry to an encrypted backup file
    Export {
        /// Destination (defaults to a timestamped file under the state directory)
        path: Option<PathBuf>,

        #[arg(long, env = "GNOMAN_BACKUP_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },

    /// Restore entries from an encrypted backup file
    Import {
        path: PathBuf,

        /// Overwrite entries that already exist
        #[arg(long)]
        replace: bool,

        #[arg(long, env = "GNOMAN_BACKUP_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },

    /// Re-encrypt a backup file under a new passphrase
    RotatePassphrase { path: PathBuf },
}

/// Run the backup command.
pub fn run(args: BackupArgs, config: Config) -> anyhow::Result<()> {
    let codec = BackupCodec::new(config.backup.kdf);

    match args.command {
        BackupCommand::Export { path, passphrase } => {
            let path = match path {
                Some(path) => path,
                None => paths::backups_dir(&config.state_dir()?).join(format!(
                    "gnoman-backup-{}.json",
                    Utc::now().format("%Y%m%dT%H%M%SZ")
                )),
            };
            let passphrase = prompt::passphrase(passphrase, "Backup passphrase", true)?;
            let ctx = AppContext::open(config)?;
            let entries = ctx.store.export_entries()?;
            let envelope = codec.save(&entries, passphrase.expose_secret())?;
            backup::write_envelope(&path, &envelope)?;
            println!("Wrote {} entr(ies) to {}", entries.len(), path.display());
        }

        BackupCommand::Import {
            path,
            replace,
            passphrase,
        } => {
            let envelope = backup::read_envelope(&path)?;
            let passphrase = prompt::passphrase(passphrase, "Backup passphrase", false)?;
            let entries = codec.load(&envelope, passphrase.expose_secret())?;
            let ctx = AppContext::open(config)?;
            let imported = ctx.store.import_entries(&entries, replace)?;
            println!(
                "Imported {imported} of {} entr(ies) from {}",
                entries.len(),
                path.display()
            );
        }

        BackupCommand::RotatePassphrase { path } => {
            let old = prompt::passphrase(None, "Current passphrase", false)?;
            let new = prompt::passphrase(None, "New passphrase", true)?;
            codec.rotate_file(&path, old.expose_secret(), new.expose_secret())?;
            println!("Passphrase rotated for {}", path.display());
        }
    }

    Ok(())
}
