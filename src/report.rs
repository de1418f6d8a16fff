use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::stats::{RepoOutcome, RunSummary};

pub fn report_file_name(generated: &DateTime<Utc>) -> String {
    format!("github_stats_{}.json", generated.format("%Y%m%d_%H%M%S"))
}

/// Write `summary` as pretty JSON into `dir`, returning the file path.
pub fn write_json(summary: &RunSummary, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(report_file_name(&summary.date_generated));
    let content =
        serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    debug!(path = %path.display(), "Report written");
    Ok(path)
}

/// Human-readable console rendering of a run summary.
pub fn render(summary: &RunSummary) -> String {
    let s = &summary.summary;
    let t = &s.totals;
    let mut out = String::new();

    let _ = writeln!(out, "Summary ({} days):", summary.analyzed_days);
    let _ = writeln!(out, "Total repositories processed: {}", s.total_repos);
    let _ = writeln!(out, "Successful: {}", s.successful_repos);
    let _ = writeln!(out, "Failed: {}", s.failed_repos);
    let _ = writeln!(out, "Total Pull Requests Created: {}", t.pr_created());
    let _ = writeln!(out, "Total Pull Requests Closed: {}", t.pr_closed());
    let _ = writeln!(out, "Total Issues Opened: {}", t.issues_opened());
    let _ = writeln!(out, "Total Issues Closed: {}", t.issues_closed());
    let _ = writeln!(out, "Total Pull Request Commits: {}", t.pr_commits());

    let _ = writeln!(out, "\nDetailed Metrics per Repository:");
    for (repo, outcome) in &summary.details {
        let _ = writeln!(out, "\n{repo}:");
        match outcome {
            RepoOutcome::Failed { error } => {
                let _ = writeln!(out, "  Error: {error}");
            }
            RepoOutcome::Completed(stats) => {
                let _ = writeln!(out, "  Pull Requests Created: {}", stats.pr_created());
                let _ = writeln!(out, "  Pull Requests Updated: {}", stats.pr_updated());
                let _ = writeln!(out, "  Pull Requests Closed: {}", stats.pr_closed());
                let _ = writeln!(out, "  Issues Opened: {}", stats.issues_opened());
                let _ = writeln!(out, "  Issues Closed: {}", stats.issues_closed());
                let _ = writeln!(out, "  Issue Comments: {}", stats.issue_comments());
                let _ = writeln!(out, "  Pull Request Commits: {}", stats.pr_commits());
                let _ = writeln!(
                    out,
                    "  PR Commits and Issue Replies: {}",
                    stats.combined_activity()
                );
            }
        }
    }

    out
}
