use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, info};

use super::stats::{iso_week_start, median, month_bounds};
use super::types::{AggregatedMetrics, Metric, MetricKind, PrMetrics, Summary};

/// Calendar period used to bucket merged PRs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// ISO-8601 weeks, keyed `YYYY-Www`
    Weekly,
    /// Calendar months, keyed `YYYY-MM`
    Monthly,
}

impl Granularity {
    pub fn period_key(self, merged_at: DateTime<Utc>) -> String {
        match self {
            Granularity::Weekly => {
                let week = merged_at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => format!("{}-{:02}", merged_at.year(), merged_at.month()),
        }
    }

    /// Inclusive start and end instants of the period containing `merged_at`.
    pub fn bounds(self, merged_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            Granularity::Weekly => {
                let start = iso_week_start(merged_at);
                (start, start + Duration::days(6))
            }
            Granularity::Monthly => month_bounds(merged_at),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::Weekly => write!(f, "weekly"),
            Granularity::Monthly => write!(f, "monthly"),
        }
    }
}

/// Running sum, inclusion count, and collected values for one metric.
#[derive(Debug, Default)]
struct FieldAccumulator {
    sum: f64,
    included: usize,
    values: Vec<f64>,
}

impl FieldAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.included += 1;
        self.values.push(value);
    }

    fn summary(&self) -> Summary {
        if self.included == 0 {
            return Summary::default();
        }
        Summary {
            average: self.sum / self.included as f64,
            median: median(&self.values),
            samples: self.included,
        }
    }
}

struct Bucket<'a> {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    prs: Vec<&'a PrMetrics>,
}

/// Group merged PRs by the period of their merge time and summarize each group.
///
/// Unmerged PRs are skipped. The result is ordered by period key, which for
/// `YYYY-Www` and `YYYY-MM` keys is chronological.
pub fn aggregate(prs: &[PrMetrics], granularity: Granularity) -> Vec<AggregatedMetrics> {
    let mut buckets: BTreeMap<String, Bucket<'_>> = BTreeMap::new();

    for pr in prs {
        let Some(merged_at) = pr.merged_at else {
            continue;
        };
        buckets
            .entry(granularity.period_key(merged_at))
            .or_insert_with(|| {
                let (start, end) = granularity.bounds(merged_at);
                Bucket {
                    start,
                    end,
                    prs: Vec::new(),
                }
            })
            .prs
            .push(pr);
    }
    debug!(%granularity, periods = buckets.len(), "grouped merged PRs");

    buckets
        .into_iter()
        .map(|(period, bucket)| summarize(period, bucket))
        .collect()
}

fn summarize(period: String, bucket: Bucket<'_>) -> AggregatedMetrics {
    let mut accumulators: BTreeMap<Metric, FieldAccumulator> = Metric::ALL
        .iter()
        .map(|&metric| (metric, FieldAccumulator::default()))
        .collect();

    for pr in &bucket.prs {
        for (metric, accumulator) in accumulators.iter_mut() {
            let value = metric.value(pr);
            // zero or negative durations mean the event pair was not observed
            if metric.kind() == MetricKind::Count || value > 0.0 {
                accumulator.add(value);
            }
        }
    }

    debug!(period = %period, prs = bucket.prs.len(), "summarized period");
    AggregatedMetrics {
        period,
        start_date: bucket.start,
        end_date: bucket.end,
        pr_count: bucket.prs.len(),
        summaries: accumulators
            .into_iter()
            .map(|(metric, accumulator)| (metric, accumulator.summary()))
            .collect(),
    }
}

pub fn weekly(prs: &[PrMetrics]) -> Vec<AggregatedMetrics> {
    info!("calculating weekly aggregated metrics");
    let weeks = aggregate(prs, Granularity::Weekly);
    info!(weeks = weeks.len(), "calculated weekly aggregated metrics");
    weeks
}

pub fn monthly(prs: &[PrMetrics]) -> Vec<AggregatedMetrics> {
    info!("calculating monthly aggregated metrics");
    let months = aggregate(prs, Granularity::Monthly);
    info!(months = months.len(), "calculated monthly aggregated metrics");
    months
}
