use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A pull request as listed for the repository.
/// Line/file change counts are not part of the list endpoint; see `PrDetails`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Milestone title, if the PR is attached to one
    #[serde(default)]
    pub milestone: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` for PRs that were never merged
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Lifecycle state as reported by GitHub ("open", "closed")
    pub state: String,
}

/// Line and file change counts from the single-PR endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PrDetails {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    /// Author timestamp. GitHub omits it for some imported commits.
    #[serde(default)]
    pub authored_at: Option<DateTime<Utc>>,
}

/// An inline review comment on the PR diff.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewComment {
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    /// "APPROVED", "CHANGES_REQUESTED", "COMMENTED", ...
    pub state: String,
    /// Pending reviews have no submission time.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn is_approval(&self) -> bool {
        self.state == "APPROVED"
    }
}

/// Everything fetched for one PR, ready for metric derivation.
#[derive(Debug, Clone)]
pub struct PullRequestSnapshot {
    pub pull: PullRequest,
    pub details: PrDetails,
    /// In the order returned by the source (oldest first on GitHub).
    pub commits: Vec<Commit>,
    pub comments: Vec<ReviewComment>,
    pub reviews: Vec<Review>,
}

/// Owner and name of a repository, parsed from `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Inclusive creation-time window used to select PRs.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}
