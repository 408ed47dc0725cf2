//! `crmsync`: reconcile source-store contacts against the CRM.

mod config_cmd;
mod connect;
mod exit_codes;
mod ops;
mod recon;
mod sync;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use crmsync_config::{ConfigError, Settings};
use crmsync_store::StoreError;

use exit_codes::*;

#[derive(Parser)]
#[command(name = "crmsync")]
#[command(about = "Reconcile Supabase contacts against HubSpot and push status fixes")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both systems, classify every contact, and report one page
    #[command(after_help = "\
Examples:
  crmsync recon
  crmsync recon --status mismatch --json
  crmsync recon --search acme --page 2 --page-size 50
  crmsync recon --source-file contacts.json --crm-file hubspot.json --json

Exit codes:
  0  every contact matched
  3  mismatched or one-sided contacts found
  4  one side failed to fetch (partial report)
  5  both sides failed to fetch")]
    Recon(recon::ReconArgs),

    /// Copy one contact's email_verification_status to the other system
    #[command(after_help = "\
Examples:
  crmsync sync source-to-crm --source-id 42 --crm-id 1001 --value verified
  crmsync sync crm-to-source --source-id 42 --crm-id 1001 --value invalid --previous verified
  crmsync sync source-to-crm --source-id 42 --crm-id 1001 --value verified --json")]
    Sync(sync::SyncArgs),

    /// Inspect recorded sync operations
    Ops {
        #[command(subcommand)]
        command: ops::OpsCommands,
    },

    /// Show where settings live and what is in effect
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  crmsync-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  crmsync-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    // TLS handshake chatter drowns the adapter logs at debug level
    if verbose < 3 {
        builder.filter_module("rustls", log::LevelFilter::Warn);
    }
    builder.format_timestamp(None);
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Recon(args) => recon::cmd_recon(args),
        Commands::Sync(args) => sync::cmd_sync(args),
        Commands::Ops { command } => ops::cmd_ops(command),
        Commands::Config { command } => config_cmd::cmd_config(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Settings could not be loaded.
    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Missing(field) => format!("set {} in {}", field, Settings::config_path().display()),
            _ => format!("check {} or unset CRMSYNC_CONFIG", Settings::config_path().display()),
        };
        Self::new(EXIT_CONFIG_INVALID, err.to_string()).with_hint(hint)
    }

    /// Operation log failure. A missing id gets its own exit code.
    pub fn store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::new(EXIT_OPS_NOT_FOUND, format!("no sync operation with id '{}'", id))
                .with_hint("run `crmsync ops list` to see recorded operations"),
            other => Self::new(EXIT_STORE_ERROR, format!("operation log: {}", other))
                .with_hint("set CRMSYNC_OPLOG or [store] path to a writable location"),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Load the config file and environment overrides.
pub fn load_settings() -> Result<Settings, CliError> {
    Settings::load().map_err(CliError::config)
}

/// Serialize `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}
