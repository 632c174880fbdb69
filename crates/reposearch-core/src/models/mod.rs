//! Data models for repository search results.
//!
//! - `Repo`, `RepoOwner`: the internal record returned to callers
//! - GitHub search API response types, mapped field by field into `Repo`

pub mod repo;

pub use repo::{Repo, RepoOwner};
pub(crate) use repo::GitHubSearchResponse;
