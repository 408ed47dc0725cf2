use std::thread;

use crate::engine;
use crate::error::ReconError;
use crate::model::{CrmContact, SourceContact};
use crate::request::{ReconRequest, ReconResponse};
use crate::source::{ContactQuery, CrmStore, SourceError, SourceStore};

/// Rows requested from each side per run. The engine wants the full working
/// set, not a UI-sized page.
pub const DEFAULT_FETCH_LIMIT: usize = 1000;

/// Result of fetching both sides. Either side may have failed independently.
#[derive(Debug)]
pub struct FetchOutcome {
    pub source: Result<Vec<SourceContact>, SourceError>,
    pub crm: Result<Vec<CrmContact>, SourceError>,
}

/// Fetches both stores concurrently and feeds the engine.
pub struct ReconService<S, C> {
    source: S,
    crm: C,
    fetch_limit: usize,
}

impl<S: SourceStore, C: CrmStore> ReconService<S, C> {
    pub fn new(source: S, crm: C) -> Self {
        Self {
            source,
            crm,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Issue both fetches at once and wait for both.
    pub fn fetch_both(&self) -> FetchOutcome {
        let query = ContactQuery::with_limit(self.fetch_limit);

        thread::scope(|scope| {
            let source = scope.spawn(|| self.source.fetch_contacts(&query));
            let crm = scope.spawn(|| self.crm.fetch_contacts(&query));

            FetchOutcome {
                source: source
                    .join()
                    .unwrap_or_else(|_| Err(SourceError::Network("source fetch panicked".into())))
                    .map(|page| page.records),
                crm: crm
                    .join()
                    .unwrap_or_else(|_| Err(SourceError::Network("CRM fetch panicked".into())))
                    .map(|page| page.records),
            }
        })
    }

    /// Fetch, reconcile, and page. A failed side is replaced by an empty
    /// set and named in `error`; only a double failure or an invalid
    /// request yields `success = false`.
    pub fn handle(&self, request: &ReconRequest) -> ReconResponse {
        let query = match request.normalize() {
            Ok(q) => q,
            Err(e) => return ReconResponse::failure(e.to_string()),
        };

        let outcome = self.fetch_both();

        let (source, crm, warning) = match (outcome.source, outcome.crm) {
            (Ok(source), Ok(crm)) => (source, crm, None),
            (Err(e), Ok(crm)) => {
                log::warn!("source store fetch failed, reconciling CRM side only: {e}");
                (Vec::new(), crm, Some(format!("source store fetch failed: {e}")))
            }
            (Ok(source), Err(e)) => {
                log::warn!("CRM fetch failed, reconciling source side only: {e}");
                (source, Vec::new(), Some(format!("CRM fetch failed: {e}")))
            }
            (Err(source), Err(crm)) => {
                let err = ReconError::BothSourcesFailed {
                    source: source.to_string(),
                    crm: crm.to_string(),
                };
                log::warn!("{err}");
                return ReconResponse::failure(err.to_string());
            }
        };

        let mut response = engine::run(&query, &source, &crm);
        response.error = warning;
        log::info!(
            "recon: {} matched, {} mismatch, {} source only, {} CRM only",
            response.summary.matched,
            response.summary.mismatch,
            response.summary.source_only,
            response.summary.crm_only,
        );
        response
    }
}
