use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::api::{ApiError, GitHubClient, GITHUB_ACCEPT};

use super::credentials::CredentialStore;
use super::relay::HandshakeRelay;
use super::session::Session;

/// The single authority over authentication state in a process.
///
/// Construct one at startup and share it behind an `Arc`. Nothing is cached:
/// every operation reads the credential store, so the store stays the source
/// of truth for any other process reading it.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    relay: HandshakeRelay,
    client: GitHubClient,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, relay: HandshakeRelay, client: GitHubClient) -> Self {
        Self {
            store,
            relay,
            client,
        }
    }

    pub fn relay(&self) -> &HandshakeRelay {
        &self.relay
    }

    pub async fn get_auth_state(&self) -> Result<Session, ApiError> {
        let stored = self.store.load().await?;
        Ok(stored.map(Session::normalize).unwrap_or_default())
    }

    pub async fn get_auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let session = self.get_auth_state().await?;
        headers_for(session.token())
    }

    /// Run the token handshake and persist the result once it validates.
    ///
    /// A handshake that yields no token (closed surface, timeout) returns the
    /// unauthenticated session without touching the store.
    pub async fn authenticate(&self) -> Result<Session, ApiError> {
        let Some(token) = self.relay.acquire_token().await? else {
            info!("Handshake ended without a token");
            return Ok(Session::unauthenticated());
        };

        let session = Session::authenticated(token.trim());
        let Some(token) = session.token() else {
            return Err(ApiError::Authentication("Received an empty token".to_string()));
        };

        if let Err(e) = self.validate_token(token).await {
            warn!(error = %e, "Token validation failed");
            return Err(ApiError::Authentication(e.to_string()));
        }

        self.store.save(&session).await?;
        info!("Authenticated with GitHub");
        Ok(session)
    }

    /// Probe the API with `token`.
    ///
    /// Any failure clears the stored session before it is returned, so a
    /// revoked or expired token is never reused.
    pub async fn validate_token(&self, token: &str) -> Result<(), ApiError> {
        let result = match headers_for(Some(token)) {
            Ok(headers) => self.client.probe(headers).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            debug!(error = %e, "Clearing session after failed validation");
            if let Err(clear_err) = self.store.remove().await {
                warn!(error = %clear_err, "Failed to clear session after failed validation");
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.store.remove().await?;
        info!("Logged out");
        Ok(())
    }
}

/// Headers for an unauthenticated request.
pub fn anonymous_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers
}

/// Request headers for an optional token.
fn headers_for(token: Option<&str>) -> Result<HeaderMap, ApiError> {
    let mut headers = anonymous_headers();

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
            ApiError::Validation("Token contains characters not allowed in a header".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }
    Ok(headers)
}
