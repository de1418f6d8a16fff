//! Windowed counting over a repository's pull requests and issues.
//!
//! Two passes share one [`RepoStats`] accumulator, passed explicitly:
//!
//! - the pull-request pass walks `{repo}/pulls` and, for every pull request,
//!   its `commits_url` sub-collection;
//! - the issue pass walks `{repo}/issues`, skipping pull requests, and reads
//!   the first page of each issue's `comments_url`.
//!
//! Malformed items and failing sub-collections are logged and skipped. Only
//! a failure of the very first pull-request request makes the repository as
//! a whole fail.

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::github::{
    CommentItem, CommitItem, Fetcher, IssueItem, PageStyle, Paginator, PullRequestItem, RepoId,
    StopReason, Transport,
};
use crate::util::time::TimeWindow;

use super::error::StatsError;
use super::models::RepoStats;

const PER_PAGE: &str = "100";

fn listing_params() -> Vec<(String, String)> {
    [
        ("state", "all"),
        ("sort", "updated"),
        ("direction", "desc"),
        ("per_page", PER_PAGE),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn per_page_params() -> Vec<(String, String)> {
    vec![("per_page".to_string(), PER_PAGE.to_string())]
}

pub struct WindowedAggregator<'a, T> {
    fetcher: &'a Fetcher<T>,
    api_url: &'a str,
}

impl<'a, T: Transport> WindowedAggregator<'a, T> {
    pub fn new(fetcher: &'a Fetcher<T>, api_url: &'a str) -> Self {
        Self { fetcher, api_url }
    }

    /// Count activity in `window` for one repository.
    pub async fn aggregate(
        &self,
        repo: &RepoId,
        window: &TimeWindow,
    ) -> Result<RepoStats, StatsError> {
        info!(
            repo = %repo,
            start = %window.start,
            end = %window.end,
            "Analyzing repository"
        );

        let mut stats = RepoStats::default();
        self.pull_request_pass(repo, window, &mut stats).await?;
        debug!(repo = %repo, stats = ?stats, "Stats after pull requests");
        self.issue_pass(repo, window, &mut stats).await;

        Ok(stats)
    }

    async fn pull_request_pass(
        &self,
        repo: &RepoId,
        window: &TimeWindow,
        stats: &mut RepoStats,
    ) -> Result<(), StatsError> {
        let url = format!("{}/pulls", repo.api_base(self.api_url));
        let mut pages = Paginator::new(self.fetcher, url, listing_params(), PageStyle::Link);
        let mut seen = HashSet::new();

        while let Some(items) = pages.next_page().await {
            info!(
                repo = %repo,
                page = pages.pages_fetched(),
                count = items.len(),
                "Processing pull requests page"
            );

            for raw in items {
                let pr: PullRequestItem = match serde_json::from_value(raw) {
                    Ok(pr) => pr,
                    Err(e) => {
                        warn!(repo = %repo, error = %e, "Skipping malformed pull request");
                        continue;
                    }
                };

                // Updates during the walk can shift an item onto a later page.
                if !seen.insert(pr.number) {
                    debug!(repo = %repo, pr = pr.number, "Pull request already counted");
                    continue;
                }

                if window.contains(&pr.created_at) {
                    stats.record_pr_created();
                }
                if window.contains(&pr.updated_at) {
                    stats.record_pr_updated();
                }
                if let Some(closed_at) = pr.closed_at
                    && window.contains(&closed_at)
                {
                    stats.record_pr_closed();
                }

                let commits = self.count_pr_commits(&pr, window, stats).await;
                debug!(
                    repo = %repo,
                    pr = pr.number,
                    commits,
                    total_commits = stats.pr_commits(),
                    "Processed pull request"
                );
            }
        }

        if pages.pages_fetched() == 0
            && let Some(StopReason::Failed(err)) = pages.stop_reason()
        {
            return Err(StatsError::RepositoryUnavailable {
                repo: repo.full_name(),
                source: err.clone(),
            });
        }

        info!(
            repo = %repo,
            pull_requests = seen.len(),
            pr_commits = stats.pr_commits(),
            "Finished processing pull requests"
        );
        Ok(())
    }

    /// Count in-window commits of one pull request. Returns the number counted.
    async fn count_pr_commits(
        &self,
        pr: &PullRequestItem,
        window: &TimeWindow,
        stats: &mut RepoStats,
    ) -> u64 {
        let mut counted = 0;
        let mut pages = Paginator::new(
            self.fetcher,
            pr.commits_url.as_str(),
            per_page_params(),
            PageStyle::PageNumber,
        );

        while let Some(commits) = pages.next_page().await {
            for raw in commits {
                let commit: CommitItem = match serde_json::from_value(raw) {
                    Ok(commit) => commit,
                    Err(e) => {
                        warn!(pr = pr.number, error = %e, "Unexpected commit format");
                        continue;
                    }
                };

                match commit.committed_at() {
                    Some(date) if window.contains(&date) => {
                        stats.record_pr_commit();
                        counted += 1;
                    }
                    Some(_) => {}
                    None => warn!(pr = pr.number, sha = ?commit.sha, "Commit has no committer date"),
                }
            }
        }

        match pages.stop_reason() {
            Some(StopReason::Failed(err)) => {
                warn!(pr = pr.number, error = %err, "Skipping remaining commits");
            }
            Some(StopReason::Empty) if pages.pages_fetched() == 0 => {
                warn!(pr = pr.number, "No commits fetched");
            }
            _ => {}
        }

        counted
    }

    async fn issue_pass(&self, repo: &RepoId, window: &TimeWindow, stats: &mut RepoStats) {
        let url = format!("{}/issues", repo.api_base(self.api_url));
        let mut pages = Paginator::new(self.fetcher, url, listing_params(), PageStyle::Link);
        let mut seen = HashSet::new();

        while let Some(items) = pages.next_page().await {
            info!(
                repo = %repo,
                page = pages.pages_fetched(),
                count = items.len(),
                "Processing issues page"
            );

            for raw in items {
                if !raw.is_object() {
                    warn!(repo = %repo, "Unexpected issue format: {}", raw);
                    continue;
                }
                if IssueItem::is_pull_request(&raw) {
                    continue;
                }

                let issue: IssueItem = match serde_json::from_value(raw) {
                    Ok(issue) => issue,
                    Err(e) => {
                        warn!(repo = %repo, error = %e, "Skipping malformed issue");
                        continue;
                    }
                };

                if !seen.insert(issue.number) {
                    debug!(repo = %repo, issue = issue.number, "Issue already counted");
                    continue;
                }

                if window.contains(&issue.created_at) {
                    stats.record_issue_opened();
                }
                if let Some(closed_at) = issue.closed_at
                    && window.contains(&closed_at)
                {
                    stats.record_issue_closed();
                }

                let comments = self.count_issue_comments(&issue, window, stats).await;
                debug!(
                    repo = %repo,
                    issue = issue.number,
                    comments,
                    total_comments = stats.issue_comments(),
                    "Processed issue"
                );
            }
        }

        if let Some(StopReason::Failed(err)) = pages.stop_reason() {
            warn!(repo = %repo, error = %err, "Issue listing stopped early");
        }

        info!(
            repo = %repo,
            issues = seen.len(),
            issue_comments = stats.issue_comments(),
            "Finished processing issues"
        );
    }

    /// Count in-window comments on the first page of an issue's comments.
    async fn count_issue_comments(
        &self,
        issue: &IssueItem,
        window: &TimeWindow,
        stats: &mut RepoStats,
    ) -> u64 {
        if issue.comments == Some(0) {
            return 0;
        }

        let result = self
            .fetcher
            .fetch(&issue.comments_url, &per_page_params())
            .await;

        let delay = self.fetcher.policy().comment_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let comments = match result {
            Ok((Value::Array(items), _)) => items,
            Ok((other, _)) => {
                warn!(issue = issue.number, payload = %other, "Unexpected comments payload");
                return 0;
            }
            Err(err) => {
                warn!(issue = issue.number, error = %err, "Failed to fetch comments");
                return 0;
            }
        };

        let mut counted = 0;
        for raw in comments {
            match serde_json::from_value::<CommentItem>(raw) {
                Ok(comment) if window.contains(&comment.created_at) => {
                    stats.record_issue_comment();
                    counted += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(issue = issue.number, error = %e, "Skipping malformed comment"),
            }
        }
        counted
    }
}
