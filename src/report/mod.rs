pub mod csv;

use std::fs;
use std::path::Path;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::metrics::{AggregatedMetrics, Metric, PrMetrics};

pub const PR_METRICS_FILE: &str = "pr_metrics.csv";
pub const WEEKLY_METRICS_FILE: &str = "weekly_metrics.csv";
pub const MONTHLY_METRICS_FILE: &str = "monthly_metrics.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Write the per-PR, weekly, and monthly CSV files into `dir`, creating it if needed.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn write_to_directory(
    dir: &Path,
    prs: &[PrMetrics],
    weekly: &[AggregatedMetrics],
    monthly: &[AggregatedMetrics],
) -> Result<(), ReportError> {
    info!("writing metrics to directory");
    fs::create_dir_all(dir)?;

    write_file(&dir.join(PR_METRICS_FILE), &csv::pr_metrics_csv(prs), prs.len())?;
    write_file(
        &dir.join(WEEKLY_METRICS_FILE),
        &csv::aggregated_metrics_csv(weekly),
        weekly.len(),
    )?;
    write_file(
        &dir.join(MONTHLY_METRICS_FILE),
        &csv::aggregated_metrics_csv(monthly),
        monthly.len(),
    )?;

    info!("wrote metrics to directory");
    Ok(())
}

fn write_file(path: &Path, contents: &str, rows: usize) -> Result<(), ReportError> {
    fs::write(path, contents)?;
    debug!(path = %path.display(), rows, "wrote CSV file");
    Ok(())
}

/// Print a short colored digest of the run to stdout.
///
/// PR #101: "Add OAuth2 login flow" (alice) merged in 56.0h
/// ...
/// ═══ Weekly ═══
/// 2024-W02    3 PRs | lifetime avg 42.5h median 48.0h | approval avg 20.0h median 18.0h | commits avg 2.3 median 2.0
pub fn print_summary(prs: &[PrMetrics], weekly: &[AggregatedMetrics], monthly: &[AggregatedMetrics]) {
    let merged = prs.iter().filter(|pr| pr.merged_at.is_some()).count();

    println!();
    println!(
        "{} pull requests analyzed, {} merged, {} open or closed without merge",
        prs.len().to_string().bold(),
        merged.to_string().green().bold(),
        (prs.len() - merged).to_string().yellow()
    );
    println!();

    for pr in prs {
        let status = match pr.merged_at {
            Some(_) => format!("merged in {:.1}h", pr.total_pr_lifetime_hours).green(),
            None => pr.state.as_str().yellow(),
        };
        println!("PR #{}: \"{}\" ({}) {}", pr.number, pr.title, pr.author, status);
    }
    println!();

    print_periods("Weekly", weekly);
    print_periods("Monthly", monthly);
}

fn print_periods(name: &str, periods: &[AggregatedMetrics]) {
    println!("═══ {} ═══", name.bold());
    if periods.is_empty() {
        println!("  No merged PRs.");
    }
    for period in periods {
        println!("  {}", format_period_line(period));
    }
    println!();
}

fn format_period_line(period: &AggregatedMetrics) -> String {
    let lifetime = period.summary(Metric::TotalPrLifetime);
    let approval = period.summary(Metric::TimeToApproval);
    format!(
        "{:<9} {:>3} PRs | lifetime avg {:.1}h median {:.1}h | approval avg {:.1}h median {:.1}h | commits avg {:.1} median {:.1}",
        period.period,
        period.pr_count,
        lifetime.average,
        lifetime.median,
        approval.average,
        approval.median,
        period.average(Metric::CommitCount),
        period.median(Metric::CommitCount)
    )
}
