use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::github::{Fetcher, RepoId, Transport};
use crate::util::time::TimeWindow;

use super::aggregator::WindowedAggregator;
use super::error::StatsError;
use super::models::{RepoOutcome, RepoStats, RunSummary};

/// Lifecycle of one repository within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RepoOutcome {
    pub fn state(&self) -> RepoState {
        match self {
            RepoOutcome::Completed(_) => RepoState::Completed,
            RepoOutcome::Failed { .. } => RepoState::Failed,
        }
    }
}

/// Runs the aggregator over a batch of repositories, one at a time.
pub struct RepositoryStatsRunner<T> {
    fetcher: Fetcher<T>,
    api_url: String,
}

impl<T: Transport> RepositoryStatsRunner<T> {
    pub fn new(fetcher: Fetcher<T>, api_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_url: api_url.into(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Analyze every repository in `repos`. A failing repository is recorded
    /// with its error and never stops the batch.
    pub async fn run(&self, repos: &[String], window_days: u32) -> RunSummary {
        let queue = dedup_repos(repos);
        info!(
            pending = queue.len(),
            state = ?RepoState::Pending,
            "Repositories queued"
        );
        let mut details = IndexMap::with_capacity(queue.len());

        for (idx, name) in queue.iter().enumerate() {
            info!(
                repo = %name,
                position = idx + 1,
                total = queue.len(),
                state = ?RepoState::InProgress,
                "Processing repository"
            );

            let outcome = match self.analyze(name, window_days).await {
                Ok(stats) => RepoOutcome::Completed(stats),
                Err(err) => {
                    error!(repo = %name, error = %err, "Error processing repository");
                    RepoOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };

            info!(repo = %name, state = ?outcome.state(), "Repository finished");
            details.insert(name.clone(), outcome);
        }

        RunSummary::assemble(details, window_days)
    }

    async fn analyze(&self, name: &str, window_days: u32) -> Result<RepoStats, StatsError> {
        let repo: RepoId = name.parse()?;
        let window = TimeWindow::last_days(window_days);
        WindowedAggregator::new(&self.fetcher, &self.api_url)
            .aggregate(&repo, &window)
            .await
    }
}

/// Trim names, drop blanks and keep the first occurrence of each repository.
fn dedup_repos(repos: &[String]) -> Vec<String> {
    let mut queue: Vec<String> = Vec::with_capacity(repos.len());
    for repo in repos {
        let name = repo.trim();
        if name.is_empty() {
            continue;
        }
        if queue.iter().any(|queued| queued == name) {
            warn!(repo = %name, "Duplicate repository ignored");
            continue;
        }
        queue.push(name.to_string());
    }
    queue
}
