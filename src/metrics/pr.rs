use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use super::stats::{hours_between, max_gap_hours};
use super::types::PrMetrics;
use super::{BatchFailure, BatchOutcome, MetricsError};
use crate::github::{Commit, PullRequest, PullRequestSnapshot, PullRequestSource, Review, ReviewComment};

/// Derive the analytics record for one fully fetched PR.
///
/// The commit and comment lists are taken in the order the source returned
/// them: "first" and "last" are positional, not re-sorted.
pub fn compute_pr_metrics(snapshot: &PullRequestSnapshot) -> PrMetrics {
    let pull = &snapshot.pull;
    let created_at = Some(pull.created_at);

    let commits = CommitStats::from_commits(&snapshot.commits, pull.created_at);
    let first_comment_at = snapshot.comments.first().map(|c| c.created_at);
    let reviews = ReviewStats::from_reviews(&snapshot.reviews);

    let gaps = if !snapshot.commits.is_empty() && !snapshot.comments.is_empty() {
        WaitingPeriods::from_events(&snapshot.commits, &snapshot.comments)
    } else {
        WaitingPeriods::default()
    };

    PrMetrics {
        number: pull.number,
        title: pull.title.clone(),
        author: pull.author.clone(),
        milestone: pull.milestone.clone(),
        created_at: pull.created_at,
        merged_at: pull.merged_at,
        state: pull.state.clone(),

        commit_count: commits.count,
        first_commit_at: commits.first_at,
        last_commit_at: commits.last_at,
        commit_count_during_pr: commits.during_pr,

        comment_count: snapshot.comments.len() as u64,
        first_comment_at,

        review_count: reviews.count,
        approval_count: reviews.approvals,

        first_commit_to_create_hours: span_hours(commits.first_at, created_at),
        create_to_last_commit_hours: span_hours(created_at, commits.last_at),
        first_commit_to_merge_hours: span_hours(commits.first_at, pull.merged_at),
        last_commit_to_merge_hours: span_hours(commits.last_at, pull.merged_at),
        created_to_first_comment_hours: span_hours(created_at, first_comment_at),
        time_to_approval_hours: span_hours(created_at, reviews.first_approval_at),
        total_pr_lifetime_hours: span_hours(created_at, pull.merged_at),

        max_no_comment_period_hours: gaps.no_comment,
        max_no_commit_period_hours: gaps.no_commit,
        max_no_activity_period_hours: gaps.no_activity,

        additions: snapshot.details.additions,
        deletions: snapshot.details.deletions,
        changed_files: snapshot.details.changed_files,
    }
}

/// Hours from `from` to `to`, or 0.0 unless both endpoints were observed.
fn span_hours(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => hours_between(from, to),
        _ => 0.0,
    }
}

#[derive(Debug, Default)]
struct CommitStats {
    count: u64,
    first_at: Option<DateTime<Utc>>,
    last_at: Option<DateTime<Utc>>,
    during_pr: u64,
}

impl CommitStats {
    fn from_commits(commits: &[Commit], created_at: DateTime<Utc>) -> Self {
        CommitStats {
            count: commits.len() as u64,
            first_at: commits.first().and_then(|c| c.authored_at),
            last_at: commits.last().and_then(|c| c.authored_at),
            during_pr: commits
                .iter()
                .filter_map(|c| c.authored_at)
                .filter(|&at| at >= created_at)
                .count() as u64,
        }
    }
}

#[derive(Debug, Default)]
struct ReviewStats {
    count: u64,
    approvals: u64,
    first_approval_at: Option<DateTime<Utc>>,
}

impl ReviewStats {
    fn from_reviews(reviews: &[Review]) -> Self {
        let approvals: Vec<&Review> = reviews.iter().filter(|r| r.is_approval()).collect();
        ReviewStats {
            count: reviews.len() as u64,
            approvals: approvals.len() as u64,
            first_approval_at: approvals.iter().filter_map(|r| r.submitted_at).min(),
        }
    }
}

/// Longest quiet stretches inside one PR's timeline, in hours.
#[derive(Debug, Default, PartialEq)]
struct WaitingPeriods {
    no_activity: f64,
    no_comment: f64,
    no_commit: f64,
}

impl WaitingPeriods {
    fn from_events(commits: &[Commit], comments: &[ReviewComment]) -> Self {
        let commit_times: Vec<DateTime<Utc>> = commits.iter().filter_map(|c| c.authored_at).collect();
        let comment_times: Vec<DateTime<Utc>> = comments.iter().map(|c| c.created_at).collect();
        let all_times: Vec<DateTime<Utc>> = commit_times
            .iter()
            .chain(comment_times.iter())
            .copied()
            .collect();

        WaitingPeriods {
            no_activity: max_gap_hours(all_times),
            no_comment: max_gap_hours(comment_times),
            no_commit: max_gap_hours(commit_times),
        }
    }
}

/// Fetches per-PR collections from a source and derives `PrMetrics`.
pub struct PrMetricsCalculator<S> {
    source: S,
}

impl<S: PullRequestSource> PrMetricsCalculator<S> {
    pub fn new(source: S) -> Self {
        PrMetricsCalculator { source }
    }

    /// Fetch and compute metrics for one PR.
    ///
    /// Missing change counts or commits fail the PR. Missing comments or
    /// reviews are logged and treated as empty.
    #[instrument(skip(self, pull), fields(pr = pull.number))]
    pub async fn calculate(&self, pull: &PullRequest) -> Result<PrMetrics, MetricsError> {
        let number = pull.number;
        debug!(title = %pull.title, "calculating metrics");

        let details = self
            .source
            .pull_request_details(number)
            .await
            .map_err(|source| MetricsError::Details { number, source })?;

        let commits = self
            .source
            .commits(number)
            .await
            .map_err(|source| MetricsError::Commits { number, source })?;

        let comments = self.source.review_comments(number).await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch review comments, continuing without them");
            Vec::new()
        });

        let reviews = self.source.reviews(number).await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch reviews, continuing without them");
            Vec::new()
        });

        let snapshot = PullRequestSnapshot {
            pull: pull.clone(),
            details,
            commits,
            comments,
            reviews,
        };
        let metrics = compute_pr_metrics(&snapshot);

        debug!(
            commits = metrics.commit_count,
            comments = metrics.comment_count,
            reviews = metrics.review_count,
            approvals = metrics.approval_count,
            "calculated metrics"
        );
        Ok(metrics)
    }

    /// Compute metrics for every PR in order. A PR that fails is logged,
    /// recorded in `failures`, and left out of `metrics`; the batch never aborts.
    pub async fn calculate_all(&self, pulls: &[PullRequest]) -> BatchOutcome {
        info!(count = pulls.len(), "calculating metrics for pull requests");

        let mut outcome = BatchOutcome::default();
        for (index, pull) in pulls.iter().enumerate() {
            debug!(pr = pull.number, position = index + 1, total = pulls.len(), "processing PR");
            match self.calculate(pull).await {
                Ok(metrics) => outcome.metrics.push(metrics),
                Err(error) => {
                    error!(pr = pull.number, error = %error, "failed to calculate metrics, dropping PR");
                    outcome.failures.push(BatchFailure {
                        number: pull.number,
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = outcome.metrics.len(),
            total = pulls.len(),
            "calculated pull request metrics"
        );
        outcome
    }
}
