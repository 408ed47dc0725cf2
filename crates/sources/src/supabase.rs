//! Supabase (PostgREST) adapter for the source contact table.

use std::cell::Cell;

use crmsync_recon::classify::FIELD_VERIFICATION_STATUS;
use crmsync_recon::{ContactQuery, SourceContact, SourceError, SourcePage, SourceStore};

use crate::client::{extract_message, FetchClient, FetchResponse, RetryPolicy};
use crate::pager::{Fetched, PageCursor, Pager};
use crate::sync::StatusWriter;

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_TABLE: &str = "contacts";
const DEFAULT_SORT_COLUMN: &str = "created_at";
/// PostgREST's default `max-rows`.
const MAX_ROWS_PER_REQUEST: usize = 1000;

// ── Supabase client ─────────────────────────────────────────────────

pub struct SupabaseClient {
    client: FetchClient,
    base_url: String,
    service_key: String,
    table: String,
}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        service_key: &str,
        table: &str,
        policy: RetryPolicy,
    ) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::NotConfigured("SUPABASE_URL".into()));
        }
        if service_key.trim().is_empty() {
            return Err(SourceError::NotConfigured("SUPABASE_SERVICE_KEY".into()));
        }
        let table = match table.trim() {
            "" => DEFAULT_TABLE,
            t => t,
        };

        Ok(Self {
            client: FetchClient::new("Supabase", policy, extract_message)?,
            base_url: base_url.to_string(),
            service_key: service_key.trim().to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn query_params(&self, query: &ContactQuery, limit: usize, offset: usize) -> Vec<(String, String)> {
        let sort_by = query.sort_by.as_deref().unwrap_or(DEFAULT_SORT_COLUMN);
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            (
                "order".to_string(),
                format!("{}.{}", sort_by, query.sort_order.as_str()),
            ),
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        if let Some(status) = query.verification_status.as_deref() {
            params.push((FIELD_VERIFICATION_STATUS.to_string(), format!("eq.{status}")));
        }
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = sanitize_search(term);
            params.push((
                "or".to_string(),
                format!("(name.ilike.*{term}*,email.ilike.*{term}*)"),
            ));
        }
        params
    }

    fn get_rows(
        &self,
        query: &ContactQuery,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<SourceContact>, Option<usize>), SourceError> {
        let url = self.table_url();
        let params = self.query_params(query, limit, offset);
        let key = &self.service_key;

        let resp = self.client.request_with_retry(|http| {
            http.get(&url)
                .header("apikey", key)
                .bearer_auth(key)
                .header("Prefer", "count=exact")
                .query(&params)
        })?;

        let total = content_range_total(&resp);
        let rows = resp
            .body
            .as_array()
            .ok_or_else(|| SourceError::Parse("Supabase response is not a JSON array".into()))?;

        Ok((rows.iter().map(SourceContact::from_json).collect(), total))
    }

    /// Offset pager over the table. `total` keeps the first `Content-Range`
    /// count the server reports.
    fn pager<'a>(
        &'a self,
        query: &'a ContactQuery,
        page_size: usize,
        total: &'a Cell<Option<usize>>,
    ) -> Pager<SourceContact, impl FnMut(&PageCursor) -> Result<Fetched<SourceContact>, SourceError> + 'a>
    {
        Pager::new("Supabase", PageCursor::Offset(query.offset), move |cursor| {
            let offset = match cursor {
                PageCursor::Offset(o) => *o,
                PageCursor::After(_) => query.offset,
            };
            let (items, reported) = self.get_rows(query, page_size, offset)?;
            if total.get().is_none() {
                total.set(reported);
            }
            let next = next_offset(offset, items.len(), page_size, total.get());
            Ok(Fetched { items, next })
        })
    }

    /// One request: `query.limit` rows starting at `query.offset`.
    pub fn fetch_page(&self, query: &ContactQuery) -> Result<SourcePage, SourceError> {
        let total = Cell::new(None);
        let page = self
            .pager(query, query.limit.max(1), &total)
            .max_pages(1)
            .take_page()?;
        Ok(SourcePage {
            total: total.get().unwrap_or(query.offset + page.items.len()),
            records: page.items,
        })
    }

    /// Page through the table until `query.limit` rows are collected.
    pub fn fetch_all(&self, query: &ContactQuery) -> Result<SourcePage, SourceError> {
        let page_size = query.limit.clamp(1, MAX_ROWS_PER_REQUEST);
        let total = Cell::new(None);

        let mut pager = self.pager(query, page_size, &total);
        let records = pager.collect_up_to(query.limit)?.items;
        log::debug!(
            "Supabase: fetched {} rows in {} page(s)",
            records.len(),
            pager.pages_fetched(),
        );

        Ok(SourcePage {
            total: total.get().unwrap_or(records.len()),
            records,
        })
    }

    /// PATCH one row's verification status.
    pub fn update_verification_status(&self, id: &str, value: &str) -> Result<(), SourceError> {
        let url = self.table_url();
        let filter = [("id".to_string(), format!("eq.{id}"))];
        let mut body = serde_json::Map::new();
        body.insert(FIELD_VERIFICATION_STATUS.to_string(), value.into());
        let key = &self.service_key;

        self.client.request_with_retry(|http| {
            http.patch(&url)
                .header("apikey", key)
                .bearer_auth(key)
                .header("Prefer", "return=minimal")
                .query(&filter)
                .json(&body)
        })?;
        Ok(())
    }
}

impl SourceStore for SupabaseClient {
    fn fetch_contacts(&self, query: &ContactQuery) -> Result<SourcePage, SourceError> {
        self.fetch_all(query)
    }
}

impl StatusWriter for SupabaseClient {
    fn write_verification_status(&self, id: &str, value: &str) -> Result<(), SourceError> {
        self.update_verification_status(id, value)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// `Content-Range: 0-24/3573` → `Some(3573)`; `*/0` → `Some(0)`; `0-24/*` → `None`.
fn content_range_total(resp: &FetchResponse) -> Option<usize> {
    resp.headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('/').next())
        .and_then(|t| t.trim().parse().ok())
}

/// Where the following page starts. A reported total decides, since the
/// server may return fewer rows than `limit` asked for (`max-rows`).
/// Without a total only a full page implies more rows.
fn next_offset(
    offset: usize,
    fetched: usize,
    page_size: usize,
    total: Option<usize>,
) -> Option<PageCursor> {
    if fetched == 0 {
        return None;
    }
    let end = offset + fetched;
    let more = match total {
        Some(total) => end < total,
        None => fetched >= page_size,
    };
    more.then_some(PageCursor::Offset(end))
}

/// PostgREST `or=(...)` syntax reserves `,()`; drop them from free text.
fn sanitize_search(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*'))
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&server.base_url(), "service_key", "contacts", RetryPolicy::immediate(0))
            .unwrap()
    }

    fn row(id: u32) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("Person {id}"),
            "email": format!("p{id}@example.com"),
            "email_verification_status": "verified",
            "hs_object_id": format!("{}", 1000 + id),
            "created_at": "2026-01-10T08:00:00+00:00",
            "updated_at": null
        })
    }

    #[test]
    fn test_missing_credentials_not_configured() {
        let err = SupabaseClient::new("", "k", "contacts", RetryPolicy::default())
            .err()
            .unwrap();
        assert_eq!(err, SourceError::NotConfigured("SUPABASE_URL".into()));
        let err = SupabaseClient::new("https://x.supabase.co", " ", "contacts", RetryPolicy::default())
            .err()
            .unwrap();
        assert_eq!(err, SourceError::NotConfigured("SUPABASE_SERVICE_KEY".into()));
    }

    #[test]
    fn test_fetch_page_sends_postgrest_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/contacts")
                .header("apikey", "service_key")
                .header("authorization", "Bearer service_key")
                .header("prefer", "count=exact")
                .query_param("select", "*")
                .query_param("order", "created_at.desc")
                .query_param("limit", "2")
                .query_param("offset", "4")
                .query_param("email_verification_status", "eq.bounced")
                .query_param("or", "(name.ilike.*ada*,email.ilike.*ada*)");
            then.status(200)
                .header("content-range", "4-5/42")
                .json_body(serde_json::json!([row(5), row(6)]));
        });

        let query = ContactQuery {
            limit: 2,
            offset: 4,
            search: Some(" ada ".into()),
            verification_status: Some("bounced".into()),
            sort_order: crmsync_recon::source::SortOrder::Desc,
            ..Default::default()
        };
        let page = client(&server).fetch_page(&query).unwrap();

        mock.assert();
        assert_eq!(page.total, 42);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id, "5");
        assert_eq!(page.records[0].hs_object_id.as_deref(), Some("1005"));
    }

    #[test]
    fn test_fetch_all_pages_by_offset() {
        let server = MockServer::start();
        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/contacts")
                .query_param("limit", "3")
                .query_param("offset", "0");
            then.status(200)
                .header("content-range", "0-2/5")
                .json_body(serde_json::json!([row(1), row(2), row(3)]));
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/contacts")
                .query_param("limit", "3")
                .query_param("offset", "3");
            then.status(200)
                .header("content-range", "3-4/5")
                .json_body(serde_json::json!([row(4), row(5)]));
        });

        let page = client(&server)
            .fetch_contacts(&ContactQuery::with_limit(3))
            .unwrap();
        page1.assert();
        page2.assert_hits(0);
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total, 5);

        let server = MockServer::start();
        let all = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/contacts").query_param("offset", "0");
            then.status(200)
                .header("content-range", "0-4/5")
                .json_body(serde_json::json!([row(1), row(2), row(3), row(4), row(5)]));
        });
        let page = client(&server)
            .fetch_contacts(&ContactQuery::with_limit(1000))
            .unwrap();
        all.assert();
        assert_eq!(page.records.len(), 5);
    }

    #[test]
    fn test_fetch_all_follows_total_past_capped_pages() {
        // Server-side max-rows of 2, below the requested page size.
        let server = MockServer::start();
        let pages = [
            (0, "0-1/5", serde_json::json!([row(1), row(2)])),
            (2, "2-3/5", serde_json::json!([row(3), row(4)])),
            (4, "4-4/5", serde_json::json!([row(5)])),
        ];
        let mocks: Vec<_> = pages
            .iter()
            .map(|(offset, range, body)| {
                server.mock(|when, then| {
                    when.method(GET)
                        .path("/rest/v1/contacts")
                        .query_param("limit", "1000")
                        .query_param("offset", offset.to_string());
                    then.status(200)
                        .header("content-range", *range)
                        .json_body(body.clone());
                })
            })
            .collect();

        let page = client(&server)
            .fetch_all(&ContactQuery::with_limit(1000))
            .unwrap();

        for mock in &mocks {
            mock.assert_hits(1);
        }
        assert_eq!(page.total, 5);
        let ids: Vec<&str> = page.records.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(0, 2, 1000, Some(5)), Some(PageCursor::Offset(2)));
        assert_eq!(next_offset(4, 1, 1000, Some(5)), None);
        assert_eq!(next_offset(0, 3, 3, None), Some(PageCursor::Offset(3)));
        assert_eq!(next_offset(0, 2, 3, None), None);
        assert_eq!(next_offset(8, 0, 3, Some(50)), None);
    }

    #[test]
    fn test_fetch_page_is_a_single_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/contacts").query_param("offset", "0");
            then.status(200)
                .header("content-range", "0-1/9")
                .json_body(serde_json::json!([row(1), row(2)]));
        });

        let page = client(&server)
            .fetch_page(&ContactQuery::with_limit(2))
            .unwrap();
        mock.assert_hits(1);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 9);
    }

    #[test]
    fn test_malformed_row_degrades() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/contacts");
            then.status(200)
                .json_body(serde_json::json!([{ "id": 9, "email": "x@y.com" }]));
        });

        let page = client(&server)
            .fetch_page(&ContactQuery::with_limit(10))
            .unwrap();
        let contact = &page.records[0];
        assert_eq!(contact.name, "");
        assert_eq!(contact.email_verification_status, None);
        assert_eq!(contact.hs_object_id, None);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_non_array_body_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/contacts");
            then.status(200).json_body(serde_json::json!({ "rows": [] }));
        });
        let err = client(&server)
            .fetch_page(&ContactQuery::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_auth_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/contacts");
            then.status(401)
                .json_body(serde_json::json!({ "message": "Invalid API key", "hint": null }));
        });
        let err = client(&server)
            .fetch_page(&ContactQuery::default())
            .unwrap_err();
        assert_eq!(err, SourceError::Auth(401, "Invalid API key".into()));
    }

    #[test]
    fn test_update_verification_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/contacts")
                .query_param("id", "eq.7")
                .header("apikey", "service_key")
                .json_body(serde_json::json!({ "email_verification_status": "verified" }));
            then.status(204);
        });

        client(&server)
            .update_verification_status("7", "verified")
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_content_range_and_search_helpers() {
        assert_eq!(sanitize_search("a,b(c)*"), "abc");
        let resp = FetchResponse {
            status: 200,
            headers: {
                let mut h = reqwest::header::HeaderMap::new();
                h.insert("content-range", "*/0".parse().unwrap());
                h
            },
            body: serde_json::Value::Null,
        };
        assert_eq!(content_range_total(&resp), Some(0));
    }
}
