use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Activity counters for one repository.
///
/// Counters only move through the `record_*` methods, so
/// `combined_activity == pr_commits + issue_comments` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepoStats {
    pr_created: u64,
    pr_updated: u64,
    pr_closed: u64,
    issues_opened: u64,
    issues_closed: u64,
    issue_comments: u64,
    pr_commits: u64,
    combined_activity: u64,
}

impl RepoStats {
    pub fn record_pr_created(&mut self) {
        self.pr_created += 1;
    }

    pub fn record_pr_updated(&mut self) {
        self.pr_updated += 1;
    }

    pub fn record_pr_closed(&mut self) {
        self.pr_closed += 1;
    }

    pub fn record_issue_opened(&mut self) {
        self.issues_opened += 1;
    }

    pub fn record_issue_closed(&mut self) {
        self.issues_closed += 1;
    }

    pub fn record_pr_commit(&mut self) {
        self.pr_commits += 1;
        self.combined_activity += 1;
    }

    pub fn record_issue_comment(&mut self) {
        self.issue_comments += 1;
        self.combined_activity += 1;
    }

    /// Add every counter of `other` into `self`.
    pub fn merge(&mut self, other: &RepoStats) {
        self.pr_created += other.pr_created;
        self.pr_updated += other.pr_updated;
        self.pr_closed += other.pr_closed;
        self.issues_opened += other.issues_opened;
        self.issues_closed += other.issues_closed;
        self.issue_comments += other.issue_comments;
        self.pr_commits += other.pr_commits;
        self.combined_activity += other.combined_activity;
    }

    pub fn pr_created(&self) -> u64 {
        self.pr_created
    }

    pub fn pr_updated(&self) -> u64 {
        self.pr_updated
    }

    pub fn pr_closed(&self) -> u64 {
        self.pr_closed
    }

    pub fn issues_opened(&self) -> u64 {
        self.issues_opened
    }

    pub fn issues_closed(&self) -> u64 {
        self.issues_closed
    }

    pub fn issue_comments(&self) -> u64 {
        self.issue_comments
    }

    pub fn pr_commits(&self) -> u64 {
        self.pr_commits
    }

    pub fn combined_activity(&self) -> u64 {
        self.combined_activity
    }
}

/// Per-repository result slot in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RepoOutcome {
    Completed(RepoStats),
    Failed { error: String },
}

impl RepoOutcome {
    pub fn stats(&self) -> Option<&RepoStats> {
        match self {
            RepoOutcome::Completed(stats) => Some(stats),
            RepoOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RepoOutcome::Completed(_) => None,
            RepoOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub total_repos: usize,
    pub successful_repos: usize,
    pub failed_repos: usize,
    pub totals: RepoStats,
}

/// Result of one invocation over a batch of repositories.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub summary: SummaryTotals,
    /// Per-repository outcomes in the order the repositories were given.
    pub details: IndexMap<String, RepoOutcome>,
    pub analyzed_days: u32,
    pub date_generated: DateTime<Utc>,
}

impl RunSummary {
    /// Assemble the summary, summing totals over completed repositories only.
    pub fn assemble(details: IndexMap<String, RepoOutcome>, analyzed_days: u32) -> Self {
        let mut totals = RepoStats::default();
        let mut successful_repos = 0;

        for stats in details.values().filter_map(RepoOutcome::stats) {
            totals.merge(stats);
            successful_repos += 1;
        }

        Self {
            summary: SummaryTotals {
                total_repos: details.len(),
                successful_repos,
                failed_repos: details.len() - successful_repos,
                totals,
            },
            details,
            analyzed_days,
            date_generated: Utc::now(),
        }
    }
}
