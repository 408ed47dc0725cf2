//! Shared HTTP plumbing for the contact adapters.
//!
//! `FetchClient` owns retry, backoff and status classification. Adapters
//! own their base URL and auth, and hand a request-building closure to
//! [`FetchClient::request_with_retry`], which is called once per attempt.

use std::thread;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crmsync_recon::SourceError;

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const USER_AGENT: &str = concat!("crmsync/", env!("CARGO_PKG_VERSION"));

// ── Retry policy ────────────────────────────────────────────────────

/// How hard to retry 429/5xx responses and transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// First backoff; doubles after each retry.
    pub base_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// A successful response: parsed body plus the headers adapters need
/// (`Content-Range` for row totals).
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// `Null` for an empty body (204 and friends).
    pub body: serde_json::Value,
}

// ── FetchClient ─────────────────────────────────────────────────────

pub struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
    policy: RetryPolicy,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub fn new(
        source_name: &str,
        policy: RetryPolicy,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(policy.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            policy,
            error_extractor,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a request with retry + exponential backoff.
    ///
    /// 401/403 and other 4xx fail immediately. 429 and 5xx are retried,
    /// honouring `Retry-After` on 429. Transport errors are retried.
    pub fn request_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<FetchResponse, SourceError> {
        let max_retries = self.policy.max_retries;
        let mut backoff = self.policy.base_backoff;
        let mut attempt = 0u32;

        loop {
            let result = build_request(&self.http).send();

            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(SourceError::Network(format!(
                            "{} unreachable after {} attempts: {}",
                            self.source_name,
                            attempt + 1,
                            e,
                        )));
                    }
                    log::warn!(
                        "{}: retry {}/{} in {:?} ({})",
                        self.source_name,
                        attempt + 1,
                        max_retries,
                        backoff,
                        e,
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                    continue;
                }
            };

            let status = resp.status().as_u16();

            if status == 401 || status == 403 {
                return Err(SourceError::Auth(status, self.error_message(resp, status)));
            }

            if (400..500).contains(&status) && status != 429 {
                return Err(SourceError::Upstream(status, self.error_message(resp, status)));
            }

            if status == 429 || status >= 500 {
                if attempt >= max_retries {
                    let msg = self.error_message(resp, status);
                    return Err(if status == 429 {
                        SourceError::RateLimited(format!(
                            "{} after {} attempts: {}",
                            self.source_name,
                            attempt + 1,
                            msg,
                        ))
                    } else {
                        SourceError::Upstream(status, msg)
                    });
                }

                let wait = if status == 429 {
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(backoff)
                } else {
                    backoff
                };

                log::warn!(
                    "{}: retry {}/{} in {:?} (HTTP {})",
                    self.source_name,
                    attempt + 1,
                    max_retries,
                    wait,
                    status,
                );
                thread::sleep(wait);
                backoff *= 2;
                attempt += 1;
                continue;
            }

            let headers = resp.headers().clone();
            let text = resp.text().map_err(|e| {
                SourceError::Network(format!(
                    "failed to read {} response body: {}",
                    self.source_name, e,
                ))
            })?;
            let trimmed = text.trim_start_matches('\u{feff}').trim();
            let body = if trimmed.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_str(trimmed).map_err(|e| {
                    SourceError::Parse(format!(
                        "{} returned invalid JSON: {} (body: {})",
                        self.source_name,
                        e,
                        truncate(trimmed, 200),
                    ))
                })?
            };

            return Ok(FetchResponse {
                status,
                headers,
                body,
            });
        }
    }

    fn error_message(&self, resp: reqwest::blocking::Response, status: u16) -> String {
        let text = resp.text().unwrap_or_default();
        let body: serde_json::Value =
            serde_json::from_str(text.trim_start_matches('\u{feff}')).unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(text.trim().to_string())
                }
            });
        (self.error_extractor)(&body, status)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Pull a message out of the common `{"message": ...}` error shape, falling
/// back to a bare string body or the status code.
pub fn extract_message(body: &serde_json::Value, status: u16) -> String {
    body.get("message")
        .and_then(|m| m.as_str())
        .or_else(|| body.get("error").and_then(|m| m.as_str()))
        .or_else(|| body.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(retries: u32) -> FetchClient {
        FetchClient::new("Test", RetryPolicy::immediate(retries), extract_message).unwrap()
    }

    #[test]
    fn test_success_returns_body_and_headers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200)
                .header("content-range", "0-0/1")
                .body("\u{feff}{\"value\": 7}");
        });

        let resp = client(0)
            .request_with_retry(|http| http.get(server.url("/ok")))
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["value"], 7);
        assert_eq!(resp.headers.get("content-range").unwrap(), "0-0/1");
    }

    #[test]
    fn test_empty_body_is_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/row");
            then.status(204);
        });

        let resp = client(0)
            .request_with_retry(|http| http.patch(server.url("/row")))
            .unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_null());
    }

    #[test]
    fn test_auth_failure_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/secret");
            then.status(401)
                .json_body(serde_json::json!({ "message": "Invalid token" }));
        });

        let err = client(3)
            .request_with_retry(|http| http.get(server.url("/secret")))
            .unwrap_err();
        mock.assert_hits(1);
        assert_eq!(err, SourceError::Auth(401, "Invalid token".into()));
    }

    #[test]
    fn test_server_error_retried_then_fails() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503).body("unavailable");
        });

        let err = client(2)
            .request_with_retry(|http| http.get(server.url("/flaky")))
            .unwrap_err();
        mock.assert_hits(3);
        assert_eq!(err, SourceError::Upstream(503, "unavailable".into()));
    }

    #[test]
    fn test_rate_limit_exhausted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429)
                .json_body(serde_json::json!({ "message": "slow down" }));
        });

        let err = client(1)
            .request_with_retry(|http| http.get(server.url("/busy")))
            .unwrap_err();
        match err {
            SourceError::RateLimited(msg) => assert!(msg.contains("slow down"), "{msg}"),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>oops</html>");
        });

        let err = client(0)
            .request_with_retry(|http| http.get(server.url("/html")))
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)), "{err:?}");
    }

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(extract_message(&serde_json::json!({"message": "m"}), 400), "m");
        assert_eq!(extract_message(&serde_json::json!({"error": "e"}), 400), "e");
        assert_eq!(extract_message(&serde_json::json!("plain"), 500), "plain");
        assert_eq!(extract_message(&serde_json::Value::Null, 502), "HTTP 502");
    }
}
