//! Messages exchanged across the runtime boundary.
//!
//! Requests are tagged by `action` exactly as the extension's UI sends them,
//! e.g. `{"action": "search-repos", "query": "serde", "org": "serde-rs"}`.

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::models::Repo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RuntimeMessage {
    SearchRepos {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[cfg_attr(feature = "ts", ts(optional))]
        org: Option<String>,
    },
    Authenticate,
    GetAuthState,
    Logout,
    AuthToken {
        token: String,
    },
}

impl RuntimeMessage {
    pub fn action(&self) -> &'static str {
        match self {
            RuntimeMessage::SearchRepos { .. } => "search-repos",
            RuntimeMessage::Authenticate => "authenticate",
            RuntimeMessage::GetAuthState => "get-auth-state",
            RuntimeMessage::Logout => "logout",
            RuntimeMessage::AuthToken { .. } => "auth-token",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SearchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub repos: Option<Vec<Repo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub auth_state: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn ok(session: Session) -> Self {
        Self {
            success: true,
            auth_state: Some(session),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            auth_state: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum RuntimeResponse {
    Auth(AuthResponse),
    Search(SearchResponse),
}
