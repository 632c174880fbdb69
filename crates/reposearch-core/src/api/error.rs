use thiserror::Error;

use crate::auth::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("GitHub API error: {status} {status_text}")]
    Api { status: u16, status_text: String },

    #[error("{}", rate_limit_message(.reset_time, .was_authenticated))]
    RateLimit {
        reset_time: String,
        was_authenticated: bool,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Anonymous and token-authenticated search quotas, per hour.
const ANONYMOUS_HOURLY_LIMIT: u32 = 60;
const AUTHENTICATED_HOURLY_LIMIT: u32 = 5000;

fn rate_limit_message(reset_time: &str, was_authenticated: &bool) -> String {
    if *was_authenticated {
        format!(
            "Rate limit exceeded. Resets at {}. Please try again later.",
            reset_time
        )
    } else {
        format!(
            "Rate limit exceeded. Resets at {}. Authenticate with GitHub to raise the limit from {} to {} requests per hour.",
            reset_time, ANONYMOUS_HOURLY_LIMIT, AUTHENTICATED_HOURLY_LIMIT
        )
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode) -> Self {
        ApiError::Api {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Whether the failure is GitHub's rate limit rather than a fault.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimit { .. })
    }
}
