use chrono::{DateTime, SecondsFormat, Utc};

use crate::metrics::{AggregatedMetrics, Metric, PrMetrics};

const PR_HEADER: [&str; 28] = [
    "PR Number",
    "Title",
    "Author",
    "Milestone",
    "Created At",
    "Merged At",
    "State",
    "Commit Count",
    "First Commit At",
    "Last Commit At",
    "First Commit to Create (Hours)",
    "Create to Last Commit (Hours)",
    "Commit Count During PR",
    "First Commit to Merge (Hours)",
    "Last Commit to Merge (Hours)",
    "Comment Count",
    "First Comment At",
    "Created to First Comment (Hours)",
    "Review Count",
    "Approval Count",
    "Time to Approval (Hours)",
    "Total PR Lifetime (Hours)",
    "Max No Comment Period (Hours)",
    "Max No Commit Period (Hours)",
    "Max No Activity Period (Hours)",
    "Additions",
    "Deletions",
    "Changed Files",
];

/// One header row plus one row per PR.
pub fn pr_metrics_csv(prs: &[PrMetrics]) -> String {
    let mut out = String::new();
    push_row(&mut out, PR_HEADER.iter().map(|h| h.to_string()));

    for pr in prs {
        push_row(
            &mut out,
            [
                pr.number.to_string(),
                pr.title.clone(),
                pr.author.clone(),
                pr.milestone.clone().unwrap_or_default(),
                format_time(Some(pr.created_at)),
                format_time(pr.merged_at),
                pr.state.clone(),
                pr.commit_count.to_string(),
                format_time(pr.first_commit_at),
                format_time(pr.last_commit_at),
                format_hours(pr.first_commit_to_create_hours),
                format_hours(pr.create_to_last_commit_hours),
                pr.commit_count_during_pr.to_string(),
                format_hours(pr.first_commit_to_merge_hours),
                format_hours(pr.last_commit_to_merge_hours),
                pr.comment_count.to_string(),
                format_time(pr.first_comment_at),
                format_hours(pr.created_to_first_comment_hours),
                pr.review_count.to_string(),
                pr.approval_count.to_string(),
                format_hours(pr.time_to_approval_hours),
                format_hours(pr.total_pr_lifetime_hours),
                format_hours(pr.max_no_comment_period_hours),
                format_hours(pr.max_no_commit_period_hours),
                format_hours(pr.max_no_activity_period_hours),
                pr.additions.to_string(),
                pr.deletions.to_string(),
                pr.changed_files.to_string(),
            ],
        );
    }
    out
}

/// Period, bounds, PR count, then an Avg/Median column pair per metric.
pub fn aggregated_metrics_csv(periods: &[AggregatedMetrics]) -> String {
    let mut out = String::new();

    let header = ["Period", "Start Date", "End Date", "PR Count"]
        .into_iter()
        .map(str::to_string)
        .chain(Metric::ALL.iter().flat_map(|m| {
            [format!("Avg {}", m.label()), format!("Median {}", m.label())]
        }));
    push_row(&mut out, header);

    for period in periods {
        let fields = [
            period.period.clone(),
            format_time(Some(period.start_date)),
            format_time(Some(period.end_date)),
            period.pr_count.to_string(),
        ]
        .into_iter()
        .chain(Metric::ALL.iter().flat_map(|&m| {
            let summary = period.summary(m);
            [format_hours(summary.average), format_hours(summary.median)]
        }));
        push_row(&mut out, fields);
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields.into_iter().map(|f| escape_field(&f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote, line break, or leading space.
fn escape_field(field: &str) -> String {
    let needs_quotes = field.contains([',', '"', '\n', '\r']) || field.starts_with(' ');
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// RFC 3339 with a `Z` suffix, or an empty cell when the event was not observed.
fn format_time(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn format_hours(hours: f64) -> String {
    format!("{:.2}", hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::Summary;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn sample_pr() -> PrMetrics {
        PrMetrics {
            number: 42,
            title: "Add OAuth2 login flow".to_string(),
            author: "alice".to_string(),
            milestone: Some("v1.0".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
            merged_at: Some(Utc.with_ymd_and_hms(2024, 1, 10, 17, 0, 0).unwrap()),
            state: "closed".to_string(),
            commit_count: 3,
            total_pr_lifetime_hours: 56.0,
            time_to_approval_hours: 1.0 / 3.0,
            additions: 320,
            deletions: 45,
            changed_files: 7,
            ..Default::default()
        }
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field(" lead"), "\" lead\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_format_time() {
        let t = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        assert_eq!(format_time(Some(t)), "2024-01-08T09:00:00Z");
        assert_eq!(format_time(None), "");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(0.0), "0.00");
        assert_eq!(format_hours(1.0 / 3.0), "0.33");
        assert_eq!(format_hours(56.0), "56.00");
    }

    #[test]
    fn test_pr_csv_layout() {
        let csv = pr_metrics_csv(&[sample_pr()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("PR Number,Title,Author,Milestone,Created At"));
        assert_eq!(lines[0].split(',').count(), 28);

        let row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(row.len(), 28);
        assert_eq!(row[0], "42");
        assert_eq!(row[3], "v1.0");
        assert_eq!(row[5], "2024-01-10T17:00:00Z");
        // no commit timestamps recorded
        assert_eq!(row[8], "");
        assert_eq!(row[20], "0.33");
        assert_eq!(row[21], "56.00");
        assert_eq!(row[27], "7");
    }

    #[test]
    fn test_pr_csv_quotes_title() {
        let mut pr = sample_pr();
        pr.title = "Fix cache, \"hot\" path".to_string();
        let csv = pr_metrics_csv(&[pr]);
        assert!(csv.contains("\"Fix cache, \"\"hot\"\" path\""));
    }

    #[test]
    fn test_aggregated_csv_layout() {
        let mut summaries = BTreeMap::new();
        summaries.insert(
            Metric::CommitCount,
            Summary {
                average: 3.0,
                median: 3.0,
                samples: 3,
            },
        );
        let period = AggregatedMetrics {
            period: "2024-W02".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap(),
            pr_count: 3,
            summaries,
        };

        let csv = aggregated_metrics_csv(&[period]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(
            "Period,Start Date,End Date,PR Count,Avg Commit Count,Median Commit Count,Avg Comment Count"
        ));
        assert!(lines[0].ends_with("Median Max No Activity Period (Hours)"));
        assert_eq!(lines[0].split(',').count(), 4 + 2 * Metric::ALL.len());
        assert!(lines[1].starts_with(
            "2024-W02,2024-01-08T00:00:00Z,2024-01-14T00:00:00Z,3,3.00,3.00,0.00,0.00"
        ));
    }

    #[test]
    fn test_empty_collections_produce_header_only() {
        assert_eq!(pr_metrics_csv(&[]).lines().count(), 1);
        assert_eq!(aggregated_metrics_csv(&[]).lines().count(), 1);
    }
}
