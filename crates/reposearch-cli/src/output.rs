//! Plain-text rendering of search results and status lines.

use reposearch_core::{Repo, Session};

/// Width at which descriptions are cut off.
const DESCRIPTION_WIDTH: usize = 96;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_repo(repo: &Repo) -> String {
    let mut out = format!(
        "{}  ★ {}  {}\n",
        repo.full_name,
        repo.display_stars(),
        repo.display_language()
    );
    if let Some(description) = repo.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!(
            "    {}\n",
            truncate_string(description.trim(), DESCRIPTION_WIDTH)
        ));
    }
    out.push_str(&format!("    {}", repo.url));
    out
}

pub fn format_results(repos: &[Repo]) -> String {
    repos.iter().map(format_repo).collect::<Vec<_>>().join("\n\n")
}

/// Hint shown when an organization search comes back empty.
pub fn empty_org_hint(query: &str, org: &str, session: &Session) -> String {
    let reason = if session.is_authenticated() {
        "You may not have access to this organization, or it may not exist."
    } else {
        "Private organizations require authentication. Run `reposearch login`."
    };
    format!(
        "No repositories found for \"{}\" in organization \"{}\".\n{}",
        query, org, reason
    )
}

pub fn format_status(session: &Session) -> &'static str {
    if session.is_authenticated() {
        "Authenticated with a personal access token (5000 searches per hour)"
    } else {
        "Not authenticated (60 searches per hour)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposearch_core::models::RepoOwner;

    fn repo(description: Option<&str>) -> Repo {
        Repo {
            id: 1,
            name: "tokio".to_string(),
            full_name: "tokio-rs/tokio".to_string(),
            description: description.map(str::to_string),
            stars: 25_400,
            language: Some("Rust".to_string()),
            url: "https://github.com/tokio-rs/tokio".to_string(),
            owner: RepoOwner {
                login: "tokio-rs".to_string(),
                avatar_url: "https://avatars.githubusercontent.com/u/20248544".to_string(),
            },
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_format_repo() {
        let text = format_repo(&repo(Some("A runtime for writing reliable applications")));
        assert_eq!(
            text,
            "tokio-rs/tokio  ★ 25.4k  Rust\n    A runtime for writing reliable applications\n    https://github.com/tokio-rs/tokio"
        );
    }

    #[test]
    fn test_format_repo_without_description() {
        let text = format_repo(&repo(None));
        assert_eq!(
            text,
            "tokio-rs/tokio  ★ 25.4k  Rust\n    https://github.com/tokio-rs/tokio"
        );
    }

    #[test]
    fn test_empty_org_hint_depends_on_auth() {
        let anonymous = empty_org_hint("api", "acme", &Session::unauthenticated());
        assert!(anonymous.contains("require authentication"));

        let authed = empty_org_hint("api", "acme", &Session::authenticated("ghp_abc"));
        assert!(authed.contains("may not have access"));
    }
}
