//! HTTP client for the GitHub REST API.
//!
//! `GitHubClient` owns the connection pool, base URL and timeout. It never
//! decides which credentials to send: callers pass the headers built by the
//! session manager.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::{header, Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::models::{GitHubSearchResponse, Repo};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the GitHub REST API
pub const API_BASE_URL: &str = "https://api.github.com";

/// Media type requested from the API
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// GitHub rejects requests without a User-Agent.
const USER_AGENT: &str = concat!("reposearch/", env!("CARGO_PKG_VERSION"));

/// Results requested per search.
pub const SEARCH_PAGE_SIZE: u32 = 10;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE_URL)
    }

    /// Point the client at another API root (GitHub Enterprise, test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self) -> String {
        format!("{}/search/repositories", self.base_url)
    }

    /// Cheap request used to check that a token is accepted.
    pub async fn probe(&self, headers: header::HeaderMap) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.search_url())
            .headers(headers)
            .query(&[("q", "test"), ("per_page", "1")])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            debug!(status = status.as_u16(), "Token probe rejected");
            Err(ApiError::from_status(status))
        }
    }

    /// Run a repository search. `q` is passed through as-is, qualifiers included.
    pub async fn search_repositories(
        &self,
        headers: header::HeaderMap,
        q: &str,
    ) -> Result<Vec<Repo>, ApiError> {
        let was_authenticated = headers.contains_key(header::AUTHORIZATION);
        let per_page = SEARCH_PAGE_SIZE.to_string();

        let response = self
            .client
            .get(self.search_url())
            .headers(headers)
            .query(&[("q", q), ("per_page", per_page.as_str())])
            .send()
            .await?;

        let response = Self::check_search_response(response, was_authenticated)?;
        let body = response.text().await?;
        let parsed: GitHubSearchResponse = serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("{}: {}", e, ApiError::truncate_body(&body)))
        })?;

        if parsed.incomplete_results == Some(true) {
            warn!(q, "GitHub returned incomplete search results");
        }
        debug!(q, total = parsed.total_count, returned = parsed.items.len(), "Search completed");

        Ok(parsed.items.into_iter().map(Repo::from).collect())
    }

    /// Map a non-success search response to a typed error.
    fn check_search_response(
        response: Response,
        was_authenticated: bool,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN {
            let remaining = header_str(&response, RATE_LIMIT_REMAINING);
            if remaining == Some("0") {
                let reset_time = format_reset_time(header_str(&response, RATE_LIMIT_RESET));
                warn!(%reset_time, was_authenticated, "GitHub search rate limit exhausted");
                return Err(ApiError::RateLimit {
                    reset_time,
                    was_authenticated,
                });
            }
        }

        Err(ApiError::from_status(status))
    }
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Render an `X-RateLimit-Reset` value (unix seconds) for display.
pub fn format_reset_time(reset: Option<&str>) -> String {
    reset
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
