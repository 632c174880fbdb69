//! REST API client module for GitHub.
//!
//! This module provides the `GitHubClient` used for both the token probe
//! and repository searches, and the `ApiError` taxonomy shared by the whole
//! crate.
//!
//! Requests are anonymous unless the caller passes an `Authorization:
//! token <value>` header; anonymous search is limited to 60 requests per
//! hour, authenticated search to 5000.

pub mod client;
pub mod error;

pub use client::{GitHubClient, API_BASE_URL, GITHUB_ACCEPT};
pub use error::ApiError;
