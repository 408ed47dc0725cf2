//! `crmsync recon`: classify every contact across both systems.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;

use crmsync_recon::engine;
use crmsync_recon::{
    ContactComparison, CrmContact, ReconRequest, ReconResponse, ReconService, SourceContact,
};

use crate::connect;
use crate::exit_codes::{EXIT_RECON_DEGRADED, EXIT_RECON_DIFFS, EXIT_RECON_FAILED, EXIT_RECON_INPUT};
use crate::{load_settings, print_json, CliError};

#[derive(Args)]
pub struct ReconArgs {
    /// Page to show (1-based; values below 1 mean 1)
    #[arg(long)]
    pub page: Option<i64>,

    /// Rows per page, 1-1000 [default: recon.default_page_size]
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Only list one status: all, matched, mismatch, source_only, crm_only
    #[arg(long)]
    pub status: Option<String>,

    /// Case-insensitive substring match on name or email (either side)
    #[arg(long)]
    pub search: Option<String>,

    /// Output JSON to stdout instead of the human table
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Offline source-store snapshot: JSON array of contact rows
    #[arg(long, requires = "crm_file")]
    pub source_file: Option<PathBuf>,

    /// Offline CRM snapshot: JSON array of contact objects
    #[arg(long, requires = "source_file")]
    pub crm_file: Option<PathBuf>,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

pub fn cmd_recon(args: ReconArgs) -> Result<(), CliError> {
    let settings = load_settings()?;

    let request = ReconRequest {
        page: args.page,
        page_size: Some(args.page_size.unwrap_or(settings.recon.default_page_size as i64)),
        filter_status: args.status.clone(),
        search: args.search.clone(),
    };
    if let Err(e) = request.normalize() {
        return Err(CliError::usage(e.to_string())
            .with_hint("--status takes all, matched, mismatch, source_only or crm_only"));
    }

    let response = match (&args.source_file, &args.crm_file) {
        (Some(source_path), Some(crm_path)) => {
            let source: Vec<SourceContact> = load_snapshot(source_path)?
                .iter()
                .map(SourceContact::from_json)
                .collect();
            let crm: Vec<CrmContact> = load_snapshot(crm_path)?
                .iter()
                .map(CrmContact::from_json)
                .collect();
            log::info!(
                "offline recon: {} source rows from {}, {} CRM objects from {}",
                source.len(),
                source_path.display(),
                crm.len(),
                crm_path.display(),
            );
            engine::handle(&request, &source, &crm)
        }
        _ => ReconService::new(connect::source_store(&settings), connect::crm_store(&settings))
            .with_fetch_limit(settings.recon.fetch_limit)
            .handle(&request),
    };

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| CliError::io(format!("JSON serialization failed: {}", e)))?;
        fs::write(path, json + "\n")
            .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        print_json(&response)?;
    } else {
        print_human(&response);
    }

    outcome(&response)
}

/// Read a snapshot file. Accepts a bare array, or an object wrapping the
/// array in `results` (CRM search response) or `data`.
fn load_snapshot(path: &Path) -> Result<Vec<Value>, CliError> {
    let text = fs::read_to_string(path).map_err(|e| {
        recon_err(EXIT_RECON_INPUT, format!("cannot read {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
        recon_err(EXIT_RECON_INPUT, format!("{}: invalid JSON: {}", path.display(), e))
    })?;

    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut obj) => match obj.remove("results").or_else(|| obj.remove("data")) {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(recon_err(
                EXIT_RECON_INPUT,
                format!("{}: expected a JSON array of records", path.display()),
            )),
        },
        _ => Err(recon_err(
            EXIT_RECON_INPUT,
            format!("{}: expected a JSON array of records", path.display()),
        )),
    }
}

/// Map the response onto the exit-code contract.
fn outcome(response: &ReconResponse) -> Result<(), CliError> {
    if !response.success {
        let message = response
            .error
            .clone()
            .unwrap_or_else(|| "reconciliation failed".to_string());
        return Err(recon_err(EXIT_RECON_FAILED, message)
            .with_hint("check credentials with `crmsync config show`"));
    }
    if let Some(warning) = &response.error {
        return Err(recon_err(EXIT_RECON_DEGRADED, format!("partial report: {}", warning)));
    }
    let summary = response.summary;
    if !summary.is_clean() {
        return Err(recon_err(
            EXIT_RECON_DIFFS,
            format!(
                "{} of {} contacts out of sync",
                summary.total() - summary.matched,
                summary.total()
            ),
        ));
    }
    Ok(())
}

// ── Human output (stderr) ───────────────────────────────────────────

fn print_human(response: &ReconResponse) {
    if !response.success {
        return;
    }

    if response.data.is_empty() {
        eprintln!("no contacts on this page");
    } else {
        eprintln!(
            "{:<11} {:<24} {:<30} {:<30}",
            "STATUS", "NAME", "SOURCE EMAIL", "CRM EMAIL"
        );
        for c in &response.data {
            eprintln!(
                "{:<11} {:<24} {:<30} {:<30}",
                c.match_status.as_str(),
                clip(&display_name(c), 24),
                clip(c.source_record.as_ref().map_or("-", |s| s.email.as_str()), 30),
                clip(c.crm_record.as_ref().map_or("-", |r| r.properties.email.as_str()), 30),
            );
            for d in &c.differences {
                eprintln!(
                    "            {} {}: {} != {}",
                    d.severity,
                    d.field,
                    d.source_value.as_deref().unwrap_or("(none)"),
                    d.crm_value.as_deref().unwrap_or("(none)"),
                );
            }
        }
    }

    let p = &response.pagination;
    let s = &response.summary;
    eprintln!();
    eprintln!(
        "page {}/{} ({} of {} rows)",
        p.page,
        p.total_pages.max(1),
        response.data.len(),
        p.total
    );
    eprintln!(
        "matched: {}  mismatch: {}  source only: {}  crm only: {}  total: {}",
        s.matched,
        s.mismatch,
        s.source_only,
        s.crm_only,
        s.total()
    );
}

fn display_name(c: &ContactComparison) -> String {
    let source = c.source_record.as_ref().map(|s| s.name.trim().to_string());
    match source.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => c
            .crm_record
            .as_ref()
            .map(|r| r.full_name())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
