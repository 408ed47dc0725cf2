use chrono::{DateTime, Utc};

use crate::filter::apply_filters;
use crate::matcher::reconcile_at;
use crate::model::{ContactComparison, CrmContact, SourceContact};
use crate::page::paginate;
use crate::request::{Pagination, ReconQuery, ReconRequest, ReconResponse};
use crate::summary::compute_summary;

/// Reconcile two snapshots and return the requested page.
pub fn run(query: &ReconQuery, source: &[SourceContact], crm: &[CrmContact]) -> ReconResponse {
    run_at(query, source, crm, Utc::now())
}

/// Like [`run`] with a fixed reconciliation timestamp.
///
/// The summary is computed over every comparison; pagination metadata
/// describes the filtered set.
pub fn run_at(
    query: &ReconQuery,
    source: &[SourceContact],
    crm: &[CrmContact],
    run_at: DateTime<Utc>,
) -> ReconResponse {
    let comparisons = reconcile_at(source, crm, run_at);
    let summary = compute_summary(&comparisons);

    let filtered: Vec<&ContactComparison> =
        apply_filters(&comparisons, query.status, query.search.as_deref());
    let page = paginate(&filtered, query.page, query.page_size);

    log::debug!(
        "reconciled {} source / {} crm contacts into {} comparisons ({} after filter '{}')",
        source.len(),
        crm.len(),
        comparisons.len(),
        filtered.len(),
        query.status,
    );

    ReconResponse {
        success: true,
        pagination: Pagination::from(&page),
        data: page.items.into_iter().cloned().collect(),
        summary,
        error: None,
    }
}

/// Validate a raw request and run it. Invalid parameters produce a failure
/// envelope instead of an error.
pub fn handle(
    request: &ReconRequest,
    source: &[SourceContact],
    crm: &[CrmContact],
) -> ReconResponse {
    match request.normalize() {
        Ok(query) => run(&query, source, crm),
        Err(e) => ReconResponse::failure(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StatusFilter;
    use crate::model::{CrmProperties, MatchStatus};

    fn src(id: &str, key: &str) -> SourceContact {
        SourceContact {
            id: id.into(),
            name: format!("Person {id}"),
            email: format!("{id}@example.com"),
            email_verification_status: None,
            hs_object_id: Some(key.into()),
            created_at: None,
            updated_at: None,
        }
    }

    fn crm(id: &str, email: &str) -> CrmContact {
        CrmContact {
            id: id.into(),
            properties: CrmProperties {
                email: email.into(),
                ..Default::default()
            },
            created_at: None,
            updated_at: None,
        }
    }

    fn dataset() -> (Vec<SourceContact>, Vec<CrmContact>) {
        let source = vec![src("1", "A"), src("2", "B"), src("3", "Z")];
        let crm = vec![crm("A", "1@example.com"), crm("B", "wrong@example.com"), crm("C", "c@example.com")];
        (source, crm)
    }

    #[test]
    fn summary_ignores_filter() {
        let (source, crm) = dataset();
        let all = run(&ReconQuery::default(), &source, &crm);
        let matched_only = run(
            &ReconQuery {
                status: StatusFilter::Only(MatchStatus::Matched),
                ..Default::default()
            },
            &source,
            &crm,
        );

        assert_eq!(all.summary, matched_only.summary);
        assert_eq!(all.summary.total(), 4);
        assert_eq!(all.pagination.total, 4);
        assert_eq!(matched_only.pagination.total, 1);
        assert_eq!(matched_only.data.len(), 1);
    }

    #[test]
    fn page_past_end_is_empty_success() {
        let (source, crm) = dataset();
        let resp = run(
            &ReconQuery {
                page: 5,
                page_size: 2,
                ..Default::default()
            },
            &source,
            &crm,
        );
        assert!(resp.success);
        assert!(resp.data.is_empty());
        assert!(!resp.pagination.has_next);
        assert_eq!(resp.pagination.total_pages, 2);
    }

    #[test]
    fn invalid_status_yields_failure_envelope() {
        let (source, crm) = dataset();
        let resp = handle(
            &ReconRequest {
                filter_status: Some("everything".into()),
                ..Default::default()
            },
            &source,
            &crm,
        );
        assert!(!resp.success);
        assert!(resp.data.is_empty());
        assert_eq!(resp.summary.total(), 0);
        assert!(resp.error.unwrap().contains("everything"));
    }
}
