pub mod client;
pub mod fixture;
pub mod types;

pub use client::GitHubClient;
pub use fixture::FixtureSource;
pub use types::{
    Commit, DateWindow, PrDetails, PullRequest, PullRequestSnapshot, RepoRef, Review,
    ReviewComment,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API error (status code {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GitHub API rate limit exceeded. Reset at {reset}")]
    RateLimited { reset: String },

    #[error("Repository name must be in format 'owner/repo': {0}")]
    InvalidRepo(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,

    #[error("Failed to load fixture data: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("Pull request #{0} not found in data source")]
    UnknownPullRequest(u64),
}

/// Per-PR collections consumed by the metrics calculator.
///
/// Implemented by the live GitHub client and by the embedded fixture source.
/// Implementations must be Send + Sync so a calculator can be shared across tasks.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Additions, deletions, and changed-file counts for one PR.
    async fn pull_request_details(&self, number: u64) -> Result<PrDetails, GitHubError>;

    /// All commits on the PR, oldest first.
    async fn commits(&self, number: u64) -> Result<Vec<Commit>, GitHubError>;

    /// All inline review comments on the PR, oldest first.
    async fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>, GitHubError>;

    async fn reviews(&self, number: u64) -> Result<Vec<Review>, GitHubError>;
}

/// Parse `owner/repo` into its component parts.
pub fn parse_repo(repo: &str) -> Result<RepoRef, GitHubError> {
    let mut parts = repo.trim().split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(GitHubError::InvalidRepo(repo.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_repo() {
        let repo = parse_repo("org/repo").unwrap();
        assert_eq!(repo.owner, "org");
        assert_eq!(repo.name, "repo");
    }

    #[test]
    fn test_parse_invalid_repo() {
        assert!(parse_repo("repo").is_err());
        assert!(parse_repo("org/").is_err());
        assert!(parse_repo("/repo").is_err());
        assert!(parse_repo("org/repo/extra").is_err());
        assert!(parse_repo("").is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = GitHubError::Api {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "GitHub API error (status code 404): Not Found");

        let err = GitHubError::RateLimited {
            reset: "1700000000".to_string(),
        };
        assert!(err.to_string().contains("rate limit"));
    }
}
