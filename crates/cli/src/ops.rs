//! `crmsync ops`: read the sync operation log.

use clap::Subcommand;

use crmsync_recon::SyncOperation;
use crmsync_store::SqliteOpLog;

use crate::{load_settings, print_json, CliError};

#[derive(Subcommand)]
pub enum OpsCommands {
    /// List recorded operations, newest first
    #[command(after_help = "\
Examples:
  crmsync ops list
  crmsync ops list --limit 10
  crmsync ops list --json")]
    List {
        /// Show at most this many operations
        #[arg(long)]
        limit: Option<usize>,

        /// Output JSON array to stdout
        #[arg(long)]
        json: bool,
    },

    /// Show one operation by id
    #[command(after_help = "\
Examples:
  crmsync ops show 6f1c2f0e-8a4b-4c1e-9d2a-3b7e5f0a1c9d --json")]
    Show {
        /// Operation id (from `ops list` or `sync`)
        id: String,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_ops(cmd: OpsCommands) -> Result<(), CliError> {
    let settings = load_settings()?;
    let path = settings.oplog_path();
    let oplog = SqliteOpLog::open(&path).map_err(CliError::store)?;
    log::debug!("reading operation log {}", path.display());

    match cmd {
        OpsCommands::List { limit, json } => {
            let mut ops = oplog.all().map_err(CliError::store)?;
            if let Some(n) = limit {
                ops.truncate(n);
            }
            if json {
                print_json(&ops)
            } else {
                print_list(&ops);
                Ok(())
            }
        }
        OpsCommands::Show { id, json } => {
            let op = oplog.require(id.trim()).map_err(CliError::store)?;
            if json {
                print_json(&op)
            } else {
                print_detail(&op);
                Ok(())
            }
        }
    }
}

fn print_list(ops: &[SyncOperation]) {
    if ops.is_empty() {
        eprintln!("no sync operations recorded");
        return;
    }
    eprintln!(
        "{:<36}  {:<13}  {:<12}  {:<10}  {}",
        "ID", "DIRECTION", "CONTACT", "STATUS", "CREATED"
    );
    for op in ops {
        eprintln!(
            "{:<36}  {:<13}  {:<12}  {:<10}  {}",
            op.id,
            op.direction.as_str(),
            op.contact_id,
            op.status.as_str(),
            op.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

fn print_detail(op: &SyncOperation) {
    eprintln!("id:         {}", op.id);
    eprintln!("direction:  {}", op.direction);
    eprintln!("contact:    {}", op.contact_id);
    eprintln!("field:      {}", op.field);
    eprintln!("old value:  {}", op.old_value.as_deref().unwrap_or("(unknown)"));
    eprintln!("new value:  {}", op.new_value.as_deref().unwrap_or("(none)"));
    eprintln!("status:     {}", op.status);
    if let Some(err) = &op.error {
        eprintln!("error:      {}", err);
    }
    eprintln!("created:    {}", op.created_at.to_rfc3339());
    if let Some(done) = op.completed_at {
        eprintln!("completed:  {}", done.to_rfc3339());
    }
}
