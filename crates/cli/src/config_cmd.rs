//! `crmsync config`: where settings live and what is in effect.

use clap::Subcommand;

use crmsync_config::Settings;

use crate::{load_settings, print_json, CliError};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file path (CRMSYNC_CONFIG overrides the default)
    Path,

    /// Print effective settings (file plus environment), secrets redacted
    #[command(after_help = "\
Examples:
  crmsync config show
  HUBSPOT_ACCESS_TOKEN=pat-na1-... crmsync config show --json")]
    Show {
        /// Output JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Path => {
            let path = Settings::config_path();
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(not created yet; defaults and environment are in effect)");
            }
            Ok(())
        }
        ConfigCommands::Show { json } => {
            let settings = load_settings()?;
            let shown = settings.redacted();
            if json {
                return print_json(&shown);
            }
            let toml = shown.to_toml().map_err(CliError::config)?;
            print!("{}", toml);
            eprintln!("# operation log: {}", settings.oplog_path().display());
            Ok(())
        }
    }
}
