//! Repository stats from the GitHub search API.

use crate::{RegistryError, RetryPolicy, with_timeout};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stats for a package's source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub created_at: String,
    pub description: Option<String>,
    pub forks_count: u64,
    pub html_url: String,
    pub stargazers_count: u64,
}

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Extract `owner/name` from a repository URL as npm reports it.
///
/// Handles `git+https://`, `git://`, `ssh://git@`, scp-style `git@github.com:`
/// and the `github:owner/name` shorthand. Returns `None` for other hosts.
pub fn repo_slug(url: &str) -> Option<RepoSlug> {
    let path = match url.strip_prefix("github:") {
        Some(shorthand) => shorthand,
        None => {
            let idx = url.find("github.com")?;
            let rest = &url[idx + "github.com".len()..];
            rest.strip_prefix('/').or_else(|| rest.strip_prefix(':'))?
        }
    };

    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next()?.split(['#', '?']).next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return None;
    }

    Some(RepoSlug {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Source of [`GithubRepo`] stats.
#[async_trait]
pub trait RepoInfoSource: Send + Sync {
    async fn fetch_repo(&self, package: &str, slug: &RepoSlug) -> Result<GithubRepo, RegistryError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<GithubRepo>,
}

/// Stats via `GET {api}/search/repositories`.
#[derive(Debug, Clone)]
pub struct GithubSearch {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GithubSearch {
    pub const DEFAULT_URL: &'static str = "https://api.github.com";

    /// GitHub rejects requests without a `User-Agent`.
    pub fn new(
        api_url: &str,
        user_agent: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, RegistryError> {
        // No client-level timeout: `with_timeout` bounds each search.
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
            retry,
        })
    }

    async fn search_once(&self, package: &str, slug: &RepoSlug) -> Result<GithubRepo, RegistryError> {
        let unavailable = |reason: String| RegistryError::GithubUnavailable {
            package: package.to_string(),
            reason,
        };

        let query = format!(
            "{} fork:false language:js repo:{}",
            slug.name,
            slug.full_name()
        );
        let url = format!("{}/search/repositories", self.api_url);
        tracing::debug!(%url, %query, "searching github");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str())])
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed response: {}", e)))?;
        body.items
            .into_iter()
            .next()
            .ok_or_else(|| unavailable(format!("no repository matches {}", slug.full_name())))
    }
}

#[async_trait]
impl RepoInfoSource for GithubSearch {
    async fn fetch_repo(&self, package: &str, slug: &RepoSlug) -> Result<GithubRepo, RegistryError> {
        let operation = format!("github search for {}", slug.full_name());
        self.retry
            .run(&operation, || {
                with_timeout(self.timeout, operation.clone(), self.search_once(package, slug))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(owner: &str, name: &str) -> Option<RepoSlug> {
        Some(RepoSlug {
            owner: owner.into(),
            name: name.into(),
        })
    }

    #[test]
    fn test_repo_slug_forms() {
        assert_eq!(
            repo_slug("git+https://github.com/lodash/lodash.git"),
            slug("lodash", "lodash")
        );
        assert_eq!(repo_slug("git://github.com/moment/moment.git"), slug("moment", "moment"));
        assert_eq!(
            repo_slug("ssh://git@github.com/request/request.git"),
            slug("request", "request")
        );
        assert_eq!(repo_slug("git@github.com:expressjs/express.git"), slug("expressjs", "express"));
        assert_eq!(repo_slug("github:stevemao/left-pad"), slug("stevemao", "left-pad"));
        assert_eq!(
            repo_slug("https://github.com/chartjs/Chart.js"),
            slug("chartjs", "Chart.js")
        );
        assert_eq!(
            repo_slug("https://github.com/babel/babel.git#main"),
            slug("babel", "babel")
        );
    }

    #[test]
    fn test_repo_slug_rejects_other_hosts() {
        assert_eq!(repo_slug("https://gitlab.com/foo/bar.git"), None);
        assert_eq!(repo_slug("https://github.com/"), None);
        assert_eq!(repo_slug("https://github.com/owner-only"), None);
    }

    #[test]
    fn test_search_response_shape() {
        let body = r#"{"total_count":1,"items":[{"created_at":"2012-04-07T04:11:46Z","description":"A modern JavaScript utility library","forks_count":7000,"html_url":"https://github.com/lodash/lodash","stargazers_count":59000,"full_name":"lodash/lodash"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items[0].stargazers_count, 59000);
        assert_eq!(parsed.items[0].html_url, "https://github.com/lodash/lodash");
    }
}
