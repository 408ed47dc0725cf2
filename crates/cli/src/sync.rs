//! `crmsync sync`: push one verification status across.

use clap::{Args, ValueEnum};

use crmsync_recon::{OpStatus, SyncDirection, SyncOperation};
use crmsync_sources::{push_status, StatusWriter, SyncRequest, SyncTargets};
use crmsync_store::SqliteOpLog;

use crate::connect;
use crate::exit_codes::{EXIT_STORE_ERROR, EXIT_SYNC_FAILED};
use crate::{load_settings, print_json, CliError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Write the source-store value to the CRM contact
    #[value(alias = "source_to_crm")]
    SourceToCrm,
    /// Write the CRM value to the source-store row
    #[value(alias = "crm_to_source")]
    CrmToSource,
}

impl From<DirectionArg> for SyncDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::SourceToCrm => SyncDirection::SourceToCrm,
            DirectionArg::CrmToSource => SyncDirection::CrmToSource,
        }
    }
}

#[derive(Args)]
pub struct SyncArgs {
    /// Which way to copy the status
    #[arg(value_enum)]
    pub direction: DirectionArg,

    /// Source-store row id
    #[arg(long)]
    pub source_id: String,

    /// CRM contact id
    #[arg(long)]
    pub crm_id: String,

    /// New email_verification_status value
    #[arg(long)]
    pub value: String,

    /// Current value on the target side, recorded as the old value
    #[arg(long)]
    pub previous: Option<String>,

    /// Output the recorded operation as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_sync(args: SyncArgs) -> Result<(), CliError> {
    let value = args.value.trim();
    if value.is_empty() {
        return Err(CliError::usage("--value must not be empty"));
    }

    let settings = load_settings()?;
    let oplog = SqliteOpLog::open(&settings.oplog_path()).map_err(CliError::store)?;

    // Only the target side has to be configured; push_status records the
    // missing one as a failed operation.
    let source = connect::supabase(&settings)
        .map_err(|e| log::debug!("source store writer unavailable: {}", e))
        .ok();
    let crm = connect::hubspot(&settings)
        .map_err(|e| log::debug!("CRM writer unavailable: {}", e))
        .ok();
    let targets = SyncTargets {
        source: source.as_ref().map(|c| c as &dyn StatusWriter),
        crm: crm.as_ref().map(|c| c as &dyn StatusWriter),
    };

    let request = SyncRequest {
        direction: args.direction.into(),
        source_id: args.source_id.trim().to_string(),
        crm_id: args.crm_id.trim().to_string(),
        value: value.to_string(),
        previous: args.previous.clone(),
    };

    let op = push_status(&request, &targets, &oplog)
        .map_err(|e| CliError::new(EXIT_STORE_ERROR, format!("operation log: {}", e)))?;

    if args.json {
        print_json(&op)?;
    } else {
        print_op(&op);
    }

    match op.status {
        OpStatus::Failed => Err(CliError::new(
            EXIT_SYNC_FAILED,
            op.error.clone().unwrap_or_else(|| "sync failed".to_string()),
        )
        .with_hint(format!("recorded as operation {}", op.id))),
        _ => Ok(()),
    }
}

fn print_op(op: &SyncOperation) {
    eprintln!(
        "{} {} {} {} -> {} [{}]",
        op.id,
        op.direction,
        op.contact_id,
        op.old_value.as_deref().unwrap_or("(unknown)"),
        op.new_value.as_deref().unwrap_or("(none)"),
        op.status,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_maps_to_oplog_direction() {
        assert_eq!(SyncDirection::from(DirectionArg::SourceToCrm), SyncDirection::SourceToCrm);
        assert_eq!(SyncDirection::from(DirectionArg::CrmToSource), SyncDirection::CrmToSource);
    }

    #[test]
    fn direction_accepts_snake_case_alias() {
        assert_eq!(
            DirectionArg::from_str("crm_to_source", false).unwrap(),
            DirectionArg::CrmToSource
        );
        assert_eq!(
            DirectionArg::from_str("source-to-crm", false).unwrap(),
            DirectionArg::SourceToCrm
        );
    }
}
