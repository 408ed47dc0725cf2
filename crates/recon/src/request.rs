//! The request/response envelope shared by every caller of the engine.

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::filter::StatusFilter;
use crate::model::{ComparisonSummary, ContactComparison};
use crate::page::Page;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Caller-facing request. Every field is optional; see [`ReconRequest::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconRequest {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub filter_status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// A validated request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconQuery {
    pub page: usize,
    pub page_size: usize,
    pub status: StatusFilter,
    pub search: Option<String>,
}

impl Default for ReconQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            status: StatusFilter::All,
            search: None,
        }
    }
}

impl ReconRequest {
    /// Apply defaults and clamp numeric fields: page >= 1, page size in
    /// 1..=1000. An unrecognized status is an error.
    pub fn normalize(&self) -> Result<ReconQuery, ReconError> {
        let page = match self.page {
            Some(p) if p >= 1 => p as usize,
            Some(_) => 1,
            None => DEFAULT_PAGE,
        };
        let page_size = match self.page_size {
            Some(n) => n.clamp(1, MAX_PAGE_SIZE as i64) as usize,
            None => DEFAULT_PAGE_SIZE,
        };
        let status = match self.filter_status.as_deref() {
            Some(raw) => StatusFilter::parse(raw)?,
            None => StatusFilter::All,
        };
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(ReconQuery {
            page,
            page_size,
            status,
            search,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages,
            has_next: page.has_next,
            has_previous: page.has_previous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconResponse {
    pub success: bool,
    /// Current page only.
    pub data: Vec<ContactComparison>,
    pub pagination: Pagination,
    /// Counts over the unfiltered comparison set.
    pub summary: ComparisonSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconResponse {
    /// A well-formed failure: no rows, zeroed pagination and summary.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            pagination: Pagination::default(),
            summary: ComparisonSummary::default(),
            error: Some(message.into()),
        }
    }
}
