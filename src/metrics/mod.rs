pub mod aggregate;
pub mod pr;
pub mod stats;
pub mod types;

pub use pr::PrMetricsCalculator;
pub use types::{AggregatedMetrics, Metric, PrMetrics};

use thiserror::Error;

use crate::github::{GitHubError, PullRequest, PullRequestSource};

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to fetch change details for PR #{number}: {source}")]
    Details {
        number: u64,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to fetch commits for PR #{number}: {source}")]
    Commits {
        number: u64,
        #[source]
        source: GitHubError,
    },
}

/// A PR that was dropped from a batch, with the reason.
#[derive(Debug)]
pub struct BatchFailure {
    pub number: u64,
    pub error: MetricsError,
}

/// Result of computing metrics over many PRs: successes in input order, plus
/// the PRs that had to be dropped.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub metrics: Vec<PrMetrics>,
    pub failures: Vec<BatchFailure>,
}

/// Entry point used by the CLI: per-PR metrics plus weekly and monthly rollups.
pub struct Calculator<S> {
    pr_calculator: PrMetricsCalculator<S>,
}

impl<S: PullRequestSource> Calculator<S> {
    pub fn new(source: S) -> Self {
        Calculator {
            pr_calculator: PrMetricsCalculator::new(source),
        }
    }

    /// Metrics for a single PR, failing instead of dropping it. The CLI goes
    /// through the batch entry point; this one serves callers that handle
    /// one PR at a time.
    #[allow(dead_code)]
    pub async fn calculate_pr_metrics(&self, pull: &PullRequest) -> Result<PrMetrics, MetricsError> {
        self.pr_calculator.calculate(pull).await
    }

    pub async fn calculate_all_pr_metrics(&self, pulls: &[PullRequest]) -> BatchOutcome {
        self.pr_calculator.calculate_all(pulls).await
    }

    pub fn calculate_weekly_aggregated_metrics(&self, prs: &[PrMetrics]) -> Vec<AggregatedMetrics> {
        aggregate::weekly(prs)
    }

    pub fn calculate_monthly_aggregated_metrics(&self, prs: &[PrMetrics]) -> Vec<AggregatedMetrics> {
        aggregate::monthly(prs)
    }
}
