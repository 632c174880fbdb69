use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Storage key for the persisted session record.
pub const STORAGE_KEY: &str = "github_auth_state";

/// Prefixes of classic and fine-grained personal access tokens.
const TOKEN_PREFIXES: [&str; 2] = ["ghp_", "github_pat_"];

/// The persisted authentication record.
///
/// A token is present if and only if the session is authenticated. The
/// fields are private so the two constructors are the only way to build one;
/// records read back from storage go through [`Session::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Session {
    is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    token: Option<String>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// An authenticated session. An empty token yields the unauthenticated
    /// session instead.
    pub fn authenticated(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.is_empty() {
            return Self::unauthenticated();
        }
        Self {
            is_authenticated: true,
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Collapse a record that breaks the token/flag invariant (hand-edited
    /// storage, older formats) to the unauthenticated session.
    pub fn normalize(self) -> Self {
        match (self.is_authenticated, self.token) {
            (true, Some(token)) if !token.is_empty() => Self::authenticated(token),
            _ => Self::unauthenticated(),
        }
    }
}

/// Reject input that cannot be a GitHub personal access token before it is
/// sent anywhere.
pub fn check_token_format(token: &str) -> Result<(), ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Validation("Please enter a token".to_string()));
    }
    if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return Err(ApiError::Validation(
            "GitHub tokens start with \"ghp_\" or \"github_pat_\"".to_string(),
        ));
    }
    Ok(())
}
