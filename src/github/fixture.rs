use async_trait::async_trait;
use serde::Deserialize;

use super::types::{Commit, PrDetails, PullRequest, Review, ReviewComment};
use super::{GitHubError, PullRequestSource};

/// Sample repository history embedded in the binary for `--mock` runs.
const SAMPLE_PRS: &str = include_str!("../../tests/fixtures/sample_prs.json");

#[derive(Debug, Clone, Deserialize)]
struct FixturePull {
    #[serde(flatten)]
    pull: PullRequest,
    #[serde(flatten)]
    details: PrDetails,
    #[serde(default)]
    commits: Vec<Commit>,
    #[serde(default)]
    comments: Vec<ReviewComment>,
    #[serde(default)]
    reviews: Vec<Review>,
}

/// In-memory source serving PR data parsed from a JSON document.
pub struct FixtureSource {
    pulls: Vec<FixturePull>,
}

impl FixtureSource {
    pub fn from_json(json: &str) -> Result<Self, GitHubError> {
        let pulls = serde_json::from_str(json)?;
        Ok(FixtureSource { pulls })
    }

    pub fn embedded() -> Result<Self, GitHubError> {
        Self::from_json(SAMPLE_PRS)
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.pulls.iter().map(|p| p.pull.clone()).collect()
    }

    fn find(&self, number: u64) -> Result<&FixturePull, GitHubError> {
        self.pulls
            .iter()
            .find(|p| p.pull.number == number)
            .ok_or(GitHubError::UnknownPullRequest(number))
    }
}

#[async_trait]
impl PullRequestSource for FixtureSource {
    async fn pull_request_details(&self, number: u64) -> Result<PrDetails, GitHubError> {
        Ok(self.find(number)?.details)
    }

    async fn commits(&self, number: u64) -> Result<Vec<Commit>, GitHubError> {
        Ok(self.find(number)?.commits.clone())
    }

    async fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>, GitHubError> {
        Ok(self.find(number)?.comments.clone())
    }

    async fn reviews(&self, number: u64) -> Result<Vec<Review>, GitHubError> {
        Ok(self.find(number)?.reviews.clone())
    }
}
