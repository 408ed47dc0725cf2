use crate::model::{ComparisonSummary, ContactComparison, MatchStatus};

/// Count statuses over the full comparison set.
pub fn compute_summary(comparisons: &[ContactComparison]) -> ComparisonSummary {
    let mut summary = ComparisonSummary::default();

    for c in comparisons {
        match c.match_status {
            MatchStatus::Matched => summary.matched += 1,
            MatchStatus::SourceOnly => summary.source_only += 1,
            MatchStatus::CrmOnly => summary.crm_only += 1,
            MatchStatus::Mismatch => summary.mismatch += 1,
        }
    }

    summary
}
