//! Narrow interfaces the engine consumes. Implementations live in
//! `crmsync-sources`; tests use in-memory fakes.

use std::fmt;

use crate::model::{CrmContact, SourceContact};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Adapter-side filter vocabulary. Each store maps it onto its own query
/// language and ignores what it cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub limit: usize,
    /// Row offset (source store).
    pub offset: usize,
    /// Opaque continuation cursor (CRM).
    pub after: Option<String>,
    pub search: Option<String>,
    pub verification_status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            after: None,
            search: None,
            verification_status: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }
}

impl ContactQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    pub records: Vec<SourceContact>,
    /// Total matching rows reported by the store, if it reports one.
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrmPage {
    pub records: Vec<CrmContact>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Credentials or base URL missing for this side.
    NotConfigured(String),
    /// Transport failure after retries.
    Network(String),
    /// 401/403 from upstream.
    Auth(u16, String),
    /// 429 after retries.
    RateLimited(String),
    /// Other non-success status.
    Upstream(u16, String),
    /// Body was not the expected JSON shape.
    Parse(String),
    /// The upstream kept returning the same page.
    PaginationStuck(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(what) => write!(f, "not configured: {what}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Auth(status, msg) => write!(f, "auth failed ({status}): {msg}"),
            Self::RateLimited(msg) => write!(f, "rate limited: {msg}"),
            Self::Upstream(status, msg) => write!(f, "upstream error ({status}): {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::PaginationStuck(msg) => write!(f, "pagination stuck: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// The relational contact table.
pub trait SourceStore: Send + Sync {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<SourcePage, SourceError>;
}

/// The CRM contact search API.
pub trait CrmStore: Send + Sync {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<CrmPage, SourceError>;
}

impl<T: SourceStore + ?Sized> SourceStore for Box<T> {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<SourcePage, SourceError> {
        (**self).fetch_contacts(query)
    }
}

impl<T: CrmStore + ?Sized> CrmStore for Box<T> {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<CrmPage, SourceError> {
        (**self).fetch_contacts(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_messages() {
        assert_eq!(
            SourceError::Auth(401, "Invalid token".into()).to_string(),
            "auth failed (401): Invalid token"
        );
        assert_eq!(
            SourceError::NotConfigured("HUBSPOT_ACCESS_TOKEN".into()).to_string(),
            "not configured: HUBSPOT_ACCESS_TOKEN"
        );
    }
}
