use crate::error::ReconError;
use crate::model::{ContactComparison, MatchStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(MatchStatus),
}

impl StatusFilter {
    /// Parse a wire value. Unknown values are rejected rather than read as
    /// `all`, so a client typo does not silently widen the result.
    pub fn parse(raw: &str) -> Result<Self, ReconError> {
        if raw == "all" {
            return Ok(Self::All);
        }
        MatchStatus::parse(raw)
            .map(Self::Only)
            .ok_or_else(|| ReconError::InvalidFilterStatus(raw.to_string()))
    }

    pub fn accepts(&self, status: MatchStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

/// Apply the status filter and the search term (both must hold).
pub fn apply_filters<'a>(
    comparisons: &'a [ContactComparison],
    status: StatusFilter,
    search: Option<&str>,
) -> Vec<&'a ContactComparison> {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    comparisons
        .iter()
        .filter(|c| status.accepts(c.match_status))
        .filter(|c| match &needle {
            Some(n) => matches_search(c, n),
            None => true,
        })
        .collect()
}

/// `needle` must already be lowercased.
fn matches_search(comparison: &ContactComparison, needle: &str) -> bool {
    let hit = |haystack: &str| haystack.to_lowercase().contains(needle);

    if let Some(src) = &comparison.source_record {
        if hit(&src.name) || hit(&src.email) {
            return true;
        }
    }
    if let Some(crm) = &comparison.crm_record {
        if hit(&crm.full_name()) || hit(&crm.properties.email) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CrmContact, CrmProperties, SourceContact};

    fn comparison(
        status: MatchStatus,
        source: Option<(&str, &str)>,
        crm: Option<(&str, &str, &str)>,
    ) -> ContactComparison {
        ContactComparison {
            id: "c".into(),
            source_record: source.map(|(name, email)| SourceContact {
                id: "1".into(),
                name: name.into(),
                email: email.into(),
                email_verification_status: None,
                hs_object_id: None,
                created_at: None,
                updated_at: None,
            }),
            crm_record: crm.map(|(first, last, email)| CrmContact {
                id: "A".into(),
                properties: CrmProperties {
                    firstname: first.into(),
                    lastname: last.into(),
                    email: email.into(),
                    ..Default::default()
                },
                created_at: None,
                updated_at: None,
            }),
            match_status: status,
            differences: Vec::new(),
            last_sync: None,
        }
    }

    fn sample() -> Vec<ContactComparison> {
        vec![
            comparison(MatchStatus::Matched, Some(("Ada Lovelace", "ada@calc.org")), Some(("Ada", "Lovelace", "ada@calc.org"))),
            comparison(MatchStatus::SourceOnly, Some(("Charles Babbage", "cb@engine.org")), None),
            comparison(MatchStatus::CrmOnly, None, Some(("Grace", "Hopper", "grace@navy.mil"))),
        ]
    }

    #[test]
    fn parse_status_filter() {
        assert_eq!(StatusFilter::parse("all").unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::parse("crm_only").unwrap(),
            StatusFilter::Only(MatchStatus::CrmOnly)
        );
        let err = StatusFilter::parse("unmatched").unwrap_err();
        assert!(err.to_string().contains("unmatched"));
    }

    #[test]
    fn all_without_search_is_noop() {
        let data = sample();
        assert_eq!(apply_filters(&data, StatusFilter::All, None).len(), 3);
        assert_eq!(apply_filters(&data, StatusFilter::All, Some("   ")).len(), 3);
    }

    #[test]
    fn status_filter_is_exact() {
        let data = sample();
        let out = apply_filters(&data, StatusFilter::Only(MatchStatus::SourceOnly), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].match_status, MatchStatus::SourceOnly);
    }

    #[test]
    fn search_hits_crm_full_name_case_insensitively() {
        let data = sample();
        let out = apply_filters(&data, StatusFilter::All, Some("GRACE HOP"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].match_status, MatchStatus::CrmOnly);
    }

    #[test]
    fn search_hits_source_email() {
        let data = sample();
        let out = apply_filters(&data, StatusFilter::All, Some(" engine.org "));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].match_status, MatchStatus::SourceOnly);
    }

    #[test]
    fn status_and_search_compose() {
        let data = sample();
        let out = apply_filters(&data, StatusFilter::Only(MatchStatus::Matched), Some("grace"));
        assert!(out.is_empty());
    }
}
