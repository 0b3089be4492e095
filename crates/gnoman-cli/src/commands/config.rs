//! Configuration management commands.

use clap::Args;
use gnoman_core::config::Config;
use gnoman_core::paths;

use crate::render;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Write the effective configuration to the config file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command.
pub fn run(args: ConfigArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        ConfigCommand::Get { key } => match lookup(&config, &key)? {
            Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
            None => anyhow::bail!("Key not found: {}", key),
        },

        ConfigCommand::Init { force } => {
            let path = paths::config_file()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }
            config.save(&path)?;
            println!("Created config file: {:?}", path);
        }

        ConfigCommand::Path => {
            let path = paths::config_file()?;
            println!("{}", path.display());
        }

        ConfigCommand::Validate => match config.validate() {
            Ok(()) => render::ok("Configuration is valid"),
            Err(e) => {
                for problem in e.problems() {
                    render::fail(problem);
                }
                return Err(e.into());
            }
        },
    }

    Ok(())
}

/// Walk a dot-separated path through the serialized config.
fn lookup(config: &Config, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let json = serde_json::to_value(config)?;
    Ok(key
        .split('.')
        .try_fold(&json, |acc, k| acc.get(k))
        .cloned())
}
