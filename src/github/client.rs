use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::types::{Commit, DateWindow, PrDetails, PullRequest, RepoRef, Review, ReviewComment};
use super::{GitHubError, PullRequestSource};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const USER_AGENT: &str = "pr-metrics";

/// Authenticated REST client bound to a single repository.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    repo: RepoRef,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiMilestone {
    title: String,
}

#[derive(Deserialize)]
struct ApiPull {
    number: u64,
    title: String,
    user: Option<ApiUser>,
    milestone: Option<ApiMilestone>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    state: String,
}

#[derive(Deserialize)]
struct ApiPullDetails {
    additions: u64,
    deletions: u64,
    changed_files: u64,
}

#[derive(Deserialize)]
struct ApiCommit {
    commit: ApiCommitDetail,
}

#[derive(Deserialize)]
struct ApiCommitDetail {
    author: Option<ApiCommitAuthor>,
}

#[derive(Deserialize)]
struct ApiCommitAuthor {
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ApiComment {
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ApiReview {
    state: String,
    submitted_at: Option<DateTime<Utc>>,
}

impl From<ApiPull> for PullRequest {
    fn from(pull: ApiPull) -> Self {
        PullRequest {
            number: pull.number,
            title: pull.title,
            author: pull.user.map(|u| u.login).unwrap_or_default(),
            milestone: pull.milestone.map(|m| m.title),
            created_at: pull.created_at,
            merged_at: pull.merged_at,
            state: pull.state,
        }
    }
}

impl From<ApiCommit> for Commit {
    fn from(commit: ApiCommit) -> Self {
        Commit {
            authored_at: commit.commit.author.and_then(|a| a.date),
        }
    }
}

impl GitHubClient {
    /// Build a client for `repo`. A trailing slash on `api_url` is ignored, so
    /// GitHub Enterprise base URLs such as `https://ghe.example.com/api/v3/` work.
    pub fn new(api_url: &str, token: String, repo: RepoRef) -> Self {
        GitHubClient {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            repo,
        }
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url, self.repo.owner, self.repo.name, path
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GitHubError> {
        debug!(url = %url, ?query, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && rate_limit_exhausted(response.headers()))
        {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(GitHubError::RateLimited { reset });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Follow `page=N` until a page comes back shorter than `PER_PAGE`.
    async fn get_all_pages<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<T> = self
                .get_json(
                    url,
                    &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
                )
                .await?;
            let fetched = batch.len();
            items.extend(batch);
            debug!(page, fetched, total = items.len(), "fetched page");
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// List every PR created inside `window`, newest first.
    ///
    /// Pages are requested sorted by creation time descending, so pagination
    /// stops at the first PR created before the window start.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn list_pull_requests(
        &self,
        window: DateWindow,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let url = self.repo_url("/pulls");
        let mut pulls = Vec::new();
        let mut page = 1u32;

        loop {
            let batch: Vec<ApiPull> = self
                .get_json(
                    &url,
                    &[
                        ("state", "all".to_string()),
                        ("sort", "created".to_string()),
                        ("direction", "desc".to_string()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let fetched = batch.len();
            let mut reached_window_start = false;
            for pull in batch {
                if pull.created_at < window.start {
                    reached_window_start = true;
                } else if window.contains(pull.created_at) {
                    pulls.push(PullRequest::from(pull));
                }
            }
            debug!(page, fetched, kept = pulls.len(), "fetched page of pull requests");

            if fetched < PER_PAGE || reached_window_start {
                break;
            }
            page += 1;
        }

        info!(count = pulls.len(), "fetched pull requests");
        Ok(pulls)
    }
}

fn rate_limit_exhausted(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0")
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self))]
    async fn pull_request_details(&self, number: u64) -> Result<PrDetails, GitHubError> {
        let url = self.repo_url(&format!("/pulls/{}", number));
        let details: ApiPullDetails = self.get_json(&url, &[]).await?;
        Ok(PrDetails {
            additions: details.additions,
            deletions: details.deletions,
            changed_files: details.changed_files,
        })
    }

    #[instrument(skip(self))]
    async fn commits(&self, number: u64) -> Result<Vec<Commit>, GitHubError> {
        let url = self.repo_url(&format!("/pulls/{}/commits", number));
        let commits: Vec<ApiCommit> = self.get_all_pages(&url).await?;
        debug!(count = commits.len(), "fetched commits");
        Ok(commits.into_iter().map(Commit::from).collect())
    }

    #[instrument(skip(self))]
    async fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>, GitHubError> {
        let url = self.repo_url(&format!("/pulls/{}/comments", number));
        let comments: Vec<ApiComment> = self.get_all_pages(&url).await?;
        debug!(count = comments.len(), "fetched review comments");
        Ok(comments
            .into_iter()
            .map(|c| ReviewComment {
                created_at: c.created_at,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn reviews(&self, number: u64) -> Result<Vec<Review>, GitHubError> {
        let url = self.repo_url(&format!("/pulls/{}/reviews", number));
        let reviews: Vec<ApiReview> = self.get_all_pages(&url).await?;
        debug!(count = reviews.len(), "fetched reviews");
        Ok(reviews
            .into_iter()
            .map(|r| Review {
                state: r.state,
                submitted_at: r.submitted_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn repo() -> RepoRef {
        RepoRef {
            owner: "org".to_string(),
            name: "repo".to_string(),
        }
    }

    #[test]
    fn test_repo_url_trims_trailing_slash() {
        let client = GitHubClient::new("https://ghe.example.com/api/v3/", "t".to_string(), repo());
        assert_eq!(
            client.repo_url("/pulls/7"),
            "https://ghe.example.com/api/v3/repos/org/repo/pulls/7"
        );
    }

    #[test]
    fn test_repo_url_default_api() {
        let client = GitHubClient::new(DEFAULT_API_URL, "t".to_string(), repo());
        assert_eq!(client.repo_url("/pulls"), "https://api.github.com/repos/org/repo/pulls");
    }

    #[test]
    fn test_pull_conversion() {
        let json = r#"{
            "number": 12,
            "title": "Fix flaky test",
            "user": {"login": "bob"},
            "milestone": {"title": "v1.2"},
            "created_at": "2024-05-01T10:00:00Z",
            "merged_at": null,
            "state": "open"
        }"#;
        let api: ApiPull = serde_json::from_str(json).unwrap();
        let pull = PullRequest::from(api);
        assert_eq!(pull.number, 12);
        assert_eq!(pull.author, "bob");
        assert_eq!(pull.milestone.as_deref(), Some("v1.2"));
        assert!(pull.merged_at.is_none());
    }

    #[test]
    fn test_commit_without_author_date() {
        let json = r#"{"sha": "abc123", "commit": {"author": null}}"#;
        let api: ApiCommit = serde_json::from_str(json).unwrap();
        let commit = Commit::from(api);
        assert!(commit.authored_at.is_none());
    }

    #[test]
    fn test_rate_limit_header_detection() {
        let mut headers = HeaderMap::new();
        assert!(!rate_limit_exhausted(&headers));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));
        assert!(!rate_limit_exhausted(&headers));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert!(rate_limit_exhausted(&headers));
    }
}
