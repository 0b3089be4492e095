//! GNOMAN command-line interface.

pub mod commands;
pub mod context;
pub mod prompt;
pub mod render;

use std::path::Path;

use clap::{Parser, Subcommand};
use gnoman_core::config::{Config, LoggingConfig};
use gnoman_core::env::{self, vars};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// GNOMAN - local trust store for secrets
#[derive(Parser)]
#[command(name = "gnoman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "GNOMAN_CONFIG", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Read, write and rotate secrets
    Secrets(commands::secrets::SecretsArgs),

    /// Detect and reconcile drift between secret sources
    Sync(commands::sync::SyncArgs),

    /// Encrypted backups
    Backup(commands::backup::BackupArgs),

    /// Inspect and verify the audit ledger
    Audit(commands::audit::AuditArgs),

    /// Inspect the platform keyring adapter
    Keyring(commands::keyring::KeyringArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load the config named on the command line, or the default one.
///
/// Environment overrides apply in both cases.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_env_overrides();
            Ok(config)
        }
        None => Ok(Config::load_or_default()),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays usable
/// for secret values and JSON output.
pub fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = env::get_var(vars::GNOMAN_LOG)
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(format!("gnoman={level}")));

    let json_layer = logging
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!logging.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Run the CLI with the given arguments.
pub fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Secrets(args) => commands::secrets::run(args, config),
        Commands::Sync(args) => commands::sync::run(args, config),
        Commands::Backup(args) => commands::backup::run(args, config),
        Commands::Audit(args) => commands::audit::run(args, config),
        Commands::Keyring(args) => commands::keyring::run(args, config),
        Commands::Config(args) => commands::config::run(args, config),
        Commands::Version => {
            println!("gnoman {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
