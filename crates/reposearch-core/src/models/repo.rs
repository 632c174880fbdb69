use serde::{Deserialize, Serialize};

/// A repository as returned to callers of the search gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub language: Option<String>,
    pub url: String,
    pub owner: RepoOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RepoOwner {
    pub login: String,
    pub avatar_url: String,
}

impl Repo {
    pub fn display_language(&self) -> &str {
        self.language.as_deref().unwrap_or("-")
    }

    pub fn display_stars(&self) -> String {
        match self.stars {
            n if n >= 1_000_000 => format!("{:.1}m", n as f64 / 1_000_000.0),
            n if n >= 1_000 => format!("{:.1}k", n as f64 / 1_000.0),
            n => n.to_string(),
        }
    }
}

// ============================================================================
// GitHub API response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubSearchResponse {
    pub items: Vec<GitHubApiRepo>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub incomplete_results: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubApiRepo {
    id: u64,
    name: String,
    full_name: String,
    description: Option<String>,
    stargazers_count: u64,
    language: Option<String>,
    html_url: String,
    owner: GitHubApiOwner,
}

#[derive(Debug, Deserialize)]
struct GitHubApiOwner {
    login: String,
    avatar_url: String,
}

impl From<GitHubApiRepo> for Repo {
    fn from(repo: GitHubApiRepo) -> Self {
        Repo {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            stars: repo.stargazers_count,
            language: repo.language,
            url: repo.html_url,
            owner: RepoOwner {
                login: repo.owner.login,
                avatar_url: repo.owner.avatar_url,
            },
        }
    }
}
