//! Repository search on behalf of presentation surfaces.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiError, GitHubClient};
use crate::auth::{anonymous_headers, SessionManager};
use crate::models::Repo;

pub struct SearchGateway {
    client: GitHubClient,
    session: Arc<SessionManager>,
}

impl SearchGateway {
    pub fn new(client: GitHubClient, session: Arc<SessionManager>) -> Self {
        Self { client, session }
    }

    /// Search repositories matching `query`, optionally within `org`.
    ///
    /// A blank query returns no results without contacting GitHub.
    pub async fn search(&self, query: &str, org: Option<&str>) -> Result<Vec<Repo>, ApiError> {
        let Some(q) = build_query(query, org) else {
            return Ok(Vec::new());
        };

        let headers = match self.session.get_auth_headers().await {
            Ok(headers) => headers,
            Err(ApiError::Store(e)) => {
                warn!(error = %e, "Could not read session, searching anonymously");
                anonymous_headers()
            }
            Err(e) => return Err(e),
        };
        debug!(q = %q, "Searching repositories");
        self.client.search_repositories(headers, &q).await
    }
}

/// Build the `q` parameter, `None` for a blank query.
pub fn build_query(query: &str, org: Option<&str>) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    match org.map(str::trim).filter(|o| !o.is_empty()) {
        Some(org) => Some(format!("{} org:{}", query, org)),
        None => Some(query.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_blank() {
        assert_eq!(build_query("", None), None);
        assert_eq!(build_query("   \t", Some("rust-lang")), None);
    }

    #[test]
    fn test_build_query_with_org() {
        assert_eq!(build_query(" serde ", None).as_deref(), Some("serde"));
        assert_eq!(
            build_query("serde", Some("serde-rs")).as_deref(),
            Some("serde org:serde-rs")
        );
        assert_eq!(build_query("serde", Some("  ")).as_deref(), Some("serde"));
    }
}
