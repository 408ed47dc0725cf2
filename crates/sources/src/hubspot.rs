//! HubSpot CRM v3 contacts adapter.

use crmsync_recon::classify::FIELD_VERIFICATION_STATUS;
use crmsync_recon::source::SortOrder;
use crmsync_recon::{ContactQuery, CrmContact, CrmPage, CrmStore, SourceError};

use crate::client::{FetchClient, RetryPolicy};
use crate::pager::{Fetched, PageCursor, Pager};
use crate::sync::StatusWriter;

// ── Constants ───────────────────────────────────────────────────────

pub const HUBSPOT_API_BASE: &str = "https://api.hubapi.com";
/// Search endpoint page ceiling.
const SEARCH_PAGE_LIMIT: usize = 200;
const DEFAULT_SORT_PROPERTY: &str = "createdate";
const CONTACT_PROPERTIES: [&str; 5] = [
    "firstname",
    "lastname",
    "email",
    "email_verification_status",
    "hs_object_id",
];

fn extract_hubspot_error(body: &serde_json::Value, status: u16) -> String {
    let message = body["message"].as_str().or_else(|| body.as_str());
    match (message, body["category"].as_str()) {
        (Some(m), Some(c)) => format!("{m} [{c}]"),
        (Some(m), None) => m.to_string(),
        _ => format!("HTTP {status}"),
    }
}

// ── HubSpot client ──────────────────────────────────────────────────

pub struct HubSpotClient {
    client: FetchClient,
    access_token: String,
    base_url: String,
}

impl HubSpotClient {
    pub fn new(access_token: &str, policy: RetryPolicy) -> Result<Self, SourceError> {
        Self::with_base_url(access_token, HUBSPOT_API_BASE, policy)
    }

    pub fn with_base_url(
        access_token: &str,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Result<Self, SourceError> {
        if access_token.trim().is_empty() {
            return Err(SourceError::NotConfigured("HUBSPOT_ACCESS_TOKEN".into()));
        }
        let base_url = match base_url.trim().trim_end_matches('/') {
            "" => HUBSPOT_API_BASE,
            b => b,
        };

        Ok(Self {
            client: FetchClient::new("HubSpot", policy, extract_hubspot_error)?,
            access_token: access_token.trim().to_string(),
            base_url: base_url.to_string(),
        })
    }

    fn search_body(query: &ContactQuery, limit: usize, after: Option<&str>) -> serde_json::Value {
        let mut filters = Vec::new();
        if let Some(status) = query.verification_status.as_deref() {
            filters.push(serde_json::json!({
                "propertyName": FIELD_VERIFICATION_STATUS,
                "operator": "EQ",
                "value": status,
            }));
        }
        let filter_groups = if filters.is_empty() {
            serde_json::json!([])
        } else {
            serde_json::json!([{ "filters": filters }])
        };
        let direction = match query.sort_order {
            SortOrder::Asc => "ASCENDING",
            SortOrder::Desc => "DESCENDING",
        };

        let mut body = serde_json::json!({
            "filterGroups": filter_groups,
            "sorts": [{
                "propertyName": query.sort_by.as_deref().unwrap_or(DEFAULT_SORT_PROPERTY),
                "direction": direction,
            }],
            "properties": CONTACT_PROPERTIES,
            "limit": limit,
        });
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            body["query"] = term.into();
        }
        if let Some(after) = after {
            body["after"] = after.into();
        }
        body
    }

    fn search(
        &self,
        query: &ContactQuery,
        limit: usize,
        after: Option<&str>,
    ) -> Result<(Vec<CrmContact>, Option<String>), SourceError> {
        let url = format!("{}/crm/v3/objects/contacts/search", self.base_url);
        let body = Self::search_body(query, limit, after);
        let token = &self.access_token;

        let resp = self
            .client
            .request_with_retry(|http| http.post(&url).bearer_auth(token).json(&body))?;

        let results = resp.body["results"].as_array().ok_or_else(|| {
            SourceError::Parse("HubSpot response missing 'results' array".into())
        })?;
        let next_after = match &resp.body["paging"]["next"]["after"] {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        };

        Ok((results.iter().map(CrmContact::from_json).collect(), next_after))
    }

    /// Cursor pager over the search endpoint, starting at `query.after`.
    fn pager<'a>(
        &'a self,
        query: &'a ContactQuery,
        page_size: usize,
    ) -> Pager<CrmContact, impl FnMut(&PageCursor) -> Result<Fetched<CrmContact>, SourceError> + 'a>
    {
        Pager::new("HubSpot", PageCursor::After(query.after.clone()), move |cursor| {
            let after = match cursor {
                PageCursor::After(a) => a.as_deref(),
                PageCursor::Offset(_) => None,
            };
            let (items, next) = self.search(query, page_size, after)?;
            Ok(Fetched {
                items,
                next: next.map(|a| PageCursor::After(Some(a))),
            })
        })
    }

    /// One search request starting at `query.after`.
    pub fn fetch_page(&self, query: &ContactQuery) -> Result<CrmPage, SourceError> {
        let limit = query.limit.clamp(1, SEARCH_PAGE_LIMIT);
        let page = self.pager(query, limit).max_pages(1).take_page()?;
        let next_cursor = match page.next {
            Some(PageCursor::After(a)) => a,
            _ => None,
        };
        Ok(CrmPage {
            records: page.items,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }

    /// Follow `paging.next.after` until `query.limit` contacts are collected.
    pub fn fetch_all(&self, query: &ContactQuery) -> Result<CrmPage, SourceError> {
        let page_size = query.limit.clamp(1, SEARCH_PAGE_LIMIT);

        let mut pager = self.pager(query, page_size);
        let collected = pager.collect_up_to(query.limit)?;
        log::debug!(
            "HubSpot: fetched {} contacts in {} page(s)",
            collected.items.len(),
            pager.pages_fetched(),
        );

        let has_more = collected.has_more();
        let next_cursor = match collected.next {
            Some(PageCursor::After(a)) => a,
            _ => None,
        };
        Ok(CrmPage {
            records: collected.items,
            has_more,
            next_cursor,
        })
    }

    /// PATCH a single contact property.
    pub fn update_contact_property(
        &self,
        crm_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), SourceError> {
        let url = format!("{}/crm/v3/objects/contacts/{}", self.base_url, crm_id);
        let mut properties = serde_json::Map::new();
        properties.insert(property.to_string(), value.into());
        let body = serde_json::json!({ "properties": properties });
        let token = &self.access_token;

        self.client
            .request_with_retry(|http| http.patch(&url).bearer_auth(token).json(&body))?;
        Ok(())
    }
}

impl CrmStore for HubSpotClient {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<CrmPage, SourceError> {
        self.fetch_all(query)
    }
}

impl StatusWriter for HubSpotClient {
    fn write_verification_status(&self, id: &str, value: &str) -> Result<(), SourceError> {
        self.update_contact_property(id, FIELD_VERIFICATION_STATUS, value)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
