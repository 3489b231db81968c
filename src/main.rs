mod config;
mod github;
mod metrics;
mod report;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use github::{DateWindow, GitHubClient, PullRequest, PullRequestSource};
use metrics::{AggregatedMetrics, Calculator, PrMetrics};

/// PR Metrics: collects the pull requests of a GitHub repository created in a
/// date range, derives per-PR lifecycle metrics, and rolls merged PRs up into
/// weekly and monthly averages and medians written as CSV.
#[derive(Parser, Debug)]
#[command(name = "pr-metrics", version, about)]
struct Cli {
    /// Repository in the form owner/repo
    ///
    /// Not required when --mock is used.
    #[arg(short, long)]
    repo: Option<String>,

    /// GitHub personal access token (overrides config file and GITHUB_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// First PR creation date to include (YYYY-MM-DD). Defaults to 7 days ago.
    #[arg(short, long)]
    start_date: Option<NaiveDate>,

    /// Last PR creation date to include (YYYY-MM-DD, inclusive). Defaults to now.
    #[arg(short, long)]
    end_date: Option<NaiveDate>,

    /// Directory for pr_metrics.csv, weekly_metrics.csv, and monthly_metrics.csv
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Use built-in sample PR data for demo purposes (no GitHub token needed)
    #[arg(long)]
    mock: bool,
}

struct RunOutput {
    prs: Vec<PrMetrics>,
    weekly: Vec<AggregatedMetrics>,
    monthly: Vec<AggregatedMetrics>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("loading configuration");
    let config = config::Config::load()?;
    let output_dir = config.output_dir(cli.output_dir.as_deref());

    let output = if cli.mock {
        info!("using embedded sample PR data");
        let source = github::FixtureSource::embedded()?;
        let pulls = source.pull_requests();
        run(source, &pulls).await
    } else {
        let repo = cli.repo.as_deref().ok_or(
            "Repository is required unless --mock is used. Usage: pr-metrics --repo owner/repo or pr-metrics --mock",
        )?;
        let repo = github::parse_repo(repo)?;
        let token = config
            .github_token(cli.token.as_deref())
            .ok_or(github::GitHubError::MissingToken)?;
        let window = date_window(cli.start_date, cli.end_date, Utc::now())?;

        info!(
            repo = %repo,
            start = %window.start.format("%Y-%m-%d"),
            end = %window.end.format("%Y-%m-%d"),
            "fetching pull requests"
        );
        let client = GitHubClient::new(&config.api_url(cli.url.as_deref()), token, repo);
        let pulls = client.list_pull_requests(window).await?;
        info!(count = pulls.len(), "found pull requests");
        run(client, &pulls).await
    };

    report::write_to_directory(&output_dir, &output.prs, &output.weekly, &output.monthly)?;
    report::print_summary(&output.prs, &output.weekly, &output.monthly);
    info!(prs = output.prs.len(), dir = %output_dir.display(), "done");

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,pr_metrics={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run<S: PullRequestSource>(source: S, pulls: &[PullRequest]) -> RunOutput {
    let calculator = Calculator::new(source);

    let outcome = calculator.calculate_all_pr_metrics(pulls).await;
    for failure in &outcome.failures {
        warn!(pr = failure.number, reason = %failure.error, "left out of the results");
    }

    let weekly = calculator.calculate_weekly_aggregated_metrics(&outcome.metrics);
    let monthly = calculator.calculate_monthly_aggregated_metrics(&outcome.metrics);

    RunOutput {
        prs: outcome.metrics,
        weekly,
        monthly,
    }
}

/// Creation-time window for the PR listing. An explicit end date covers that
/// whole UTC day.
fn date_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<DateWindow, String> {
    let start = start
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(|| now - Duration::days(7));
    let end = end
        .map(|d| d.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::seconds(1))
        .unwrap_or(now);

    if start > end {
        return Err(format!(
            "Start date {} is after end date {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ));
    }
    Ok(DateWindow { start, end })
}
