use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Flat analytics record for one pull request.
///
/// Timestamps are `None` when the event never happened or was not observed.
/// Hour fields are 0.0 when either endpoint is missing; the aggregator treats
/// any value that is not strictly positive as "no data".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrMetrics {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub milestone: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` for PRs that were never merged
    pub merged_at: Option<DateTime<Utc>>,
    pub state: String,

    pub commit_count: u64,
    pub first_commit_at: Option<DateTime<Utc>>,
    pub last_commit_at: Option<DateTime<Utc>>,
    /// Commits authored at or after PR creation
    pub commit_count_during_pr: u64,

    pub comment_count: u64,
    pub first_comment_at: Option<DateTime<Utc>>,

    pub review_count: u64,
    pub approval_count: u64,

    pub first_commit_to_create_hours: f64,
    pub create_to_last_commit_hours: f64,
    pub first_commit_to_merge_hours: f64,
    pub last_commit_to_merge_hours: f64,
    pub created_to_first_comment_hours: f64,
    pub time_to_approval_hours: f64,
    pub total_pr_lifetime_hours: f64,

    pub max_no_comment_period_hours: f64,
    pub max_no_commit_period_hours: f64,
    pub max_no_activity_period_hours: f64,

    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// How a metric participates in aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Always observed; every PR in a bucket contributes.
    Count,
    /// Only PRs with a strictly positive value contribute.
    Duration,
}

/// Every numeric PR field that is summarized per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    CommitCount,
    CommentCount,
    ReviewCount,
    ApprovalCount,
    Additions,
    Deletions,
    ChangedFiles,
    FirstCommitToCreate,
    CreateToLastCommit,
    CommitCountDuringPr,
    FirstCommitToMerge,
    LastCommitToMerge,
    CreatedToFirstComment,
    TimeToApproval,
    TotalPrLifetime,
    MaxNoCommentPeriod,
    MaxNoCommitPeriod,
    MaxNoActivityPeriod,
}

impl Metric {
    /// Export order of the aggregated columns.
    pub const ALL: [Metric; 18] = [
        Metric::CommitCount,
        Metric::CommentCount,
        Metric::ReviewCount,
        Metric::ApprovalCount,
        Metric::Additions,
        Metric::Deletions,
        Metric::ChangedFiles,
        Metric::FirstCommitToCreate,
        Metric::CreateToLastCommit,
        Metric::CommitCountDuringPr,
        Metric::FirstCommitToMerge,
        Metric::LastCommitToMerge,
        Metric::CreatedToFirstComment,
        Metric::TimeToApproval,
        Metric::TotalPrLifetime,
        Metric::MaxNoCommentPeriod,
        Metric::MaxNoCommitPeriod,
        Metric::MaxNoActivityPeriod,
    ];

    pub fn kind(self) -> MetricKind {
        match self {
            Metric::CommitCount
            | Metric::CommentCount
            | Metric::ReviewCount
            | Metric::ApprovalCount
            | Metric::Additions
            | Metric::Deletions
            | Metric::ChangedFiles
            | Metric::CommitCountDuringPr => MetricKind::Count,
            _ => MetricKind::Duration,
        }
    }

    /// Column label without the Avg/Median prefix.
    pub fn label(self) -> &'static str {
        match self {
            Metric::CommitCount => "Commit Count",
            Metric::CommentCount => "Comment Count",
            Metric::ReviewCount => "Review Count",
            Metric::ApprovalCount => "Approval Count",
            Metric::Additions => "Additions",
            Metric::Deletions => "Deletions",
            Metric::ChangedFiles => "Changed Files",
            Metric::FirstCommitToCreate => "First Commit to Create (Hours)",
            Metric::CreateToLastCommit => "Create to Last Commit (Hours)",
            Metric::CommitCountDuringPr => "Commit Count During PR",
            Metric::FirstCommitToMerge => "First Commit to Merge (Hours)",
            Metric::LastCommitToMerge => "Last Commit to Merge (Hours)",
            Metric::CreatedToFirstComment => "Created to First Comment (Hours)",
            Metric::TimeToApproval => "Time to Approval (Hours)",
            Metric::TotalPrLifetime => "Total PR Lifetime (Hours)",
            Metric::MaxNoCommentPeriod => "Max No Comment Period (Hours)",
            Metric::MaxNoCommitPeriod => "Max No Commit Period (Hours)",
            Metric::MaxNoActivityPeriod => "Max No Activity Period (Hours)",
        }
    }

    pub fn value(self, pr: &PrMetrics) -> f64 {
        match self {
            Metric::CommitCount => pr.commit_count as f64,
            Metric::CommentCount => pr.comment_count as f64,
            Metric::ReviewCount => pr.review_count as f64,
            Metric::ApprovalCount => pr.approval_count as f64,
            Metric::Additions => pr.additions as f64,
            Metric::Deletions => pr.deletions as f64,
            Metric::ChangedFiles => pr.changed_files as f64,
            Metric::FirstCommitToCreate => pr.first_commit_to_create_hours,
            Metric::CreateToLastCommit => pr.create_to_last_commit_hours,
            Metric::CommitCountDuringPr => pr.commit_count_during_pr as f64,
            Metric::FirstCommitToMerge => pr.first_commit_to_merge_hours,
            Metric::LastCommitToMerge => pr.last_commit_to_merge_hours,
            Metric::CreatedToFirstComment => pr.created_to_first_comment_hours,
            Metric::TimeToApproval => pr.time_to_approval_hours,
            Metric::TotalPrLifetime => pr.total_pr_lifetime_hours,
            Metric::MaxNoCommentPeriod => pr.max_no_comment_period_hours,
            Metric::MaxNoCommitPeriod => pr.max_no_commit_period_hours,
            Metric::MaxNoActivityPeriod => pr.max_no_activity_period_hours,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Average and median over the PRs that observed a metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub average: f64,
    pub median: f64,
    /// Number of PRs that contributed
    pub samples: usize,
}

/// Statistical summary of the PRs merged in one week or month.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedMetrics {
    /// `YYYY-Www` for weeks, `YYYY-MM` for months
    pub period: String,
    pub start_date: DateTime<Utc>,
    /// Inclusive: Sunday 00:00 of the week, or the last day of the month at 00:00
    pub end_date: DateTime<Utc>,
    pub pr_count: usize,
    pub summaries: BTreeMap<Metric, Summary>,
}

impl AggregatedMetrics {
    /// Summary for `metric`, zeroed when nothing in the bucket observed it.
    pub fn summary(&self, metric: Metric) -> Summary {
        self.summaries.get(&metric).copied().unwrap_or_default()
    }

    pub fn average(&self, metric: Metric) -> f64 {
        self.summary(metric).average
    }

    pub fn median(&self, metric: Metric) -> f64 {
        self.summary(metric).median
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kinds() {
        let counts = Metric::ALL
            .iter()
            .filter(|m| m.kind() == MetricKind::Count)
            .count();
        assert_eq!(counts, 8);
        assert_eq!(Metric::TotalPrLifetime.kind(), MetricKind::Duration);
        assert_eq!(Metric::CommitCountDuringPr.kind(), MetricKind::Count);
    }

    #[test]
    fn test_metric_value_reads_matching_field() {
        let pr = PrMetrics {
            commit_count: 4,
            additions: 120,
            total_pr_lifetime_hours: 12.5,
            max_no_activity_period_hours: 3.0,
            ..Default::default()
        };
        assert_eq!(Metric::CommitCount.value(&pr), 4.0);
        assert_eq!(Metric::Additions.value(&pr), 120.0);
        assert_eq!(Metric::TotalPrLifetime.value(&pr), 12.5);
        assert_eq!(Metric::MaxNoActivityPeriod.value(&pr), 3.0);
        assert_eq!(Metric::Deletions.value(&pr), 0.0);
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<&str> = Metric::ALL.iter().map(|m| m.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Metric::ALL.len());
    }

    #[test]
    fn test_missing_summary_defaults_to_zero() {
        let agg = AggregatedMetrics {
            period: "2024-01".to_string(),
            start_date: DateTime::<Utc>::default(),
            end_date: DateTime::<Utc>::default(),
            pr_count: 0,
            summaries: BTreeMap::new(),
        };
        assert_eq!(agg.summary(Metric::TimeToApproval), Summary::default());
        assert_eq!(agg.average(Metric::CommitCount), 0.0);
    }
}
