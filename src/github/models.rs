use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected owner/name")]
pub struct InvalidRepoId(pub String);

impl RepoId {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// REST base for this repository, e.g. `https://api.github.com/repos/o/r`.
    pub fn api_base(&self, api_url: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            api_url.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl FromStr for RepoId {
    type Err = InvalidRepoId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };

        match trimmed.split_once('/') {
            Some((owner, name)) if valid_part(owner) && valid_part(name) => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(InvalidRepoId(s.to_string())),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestItem {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub commits_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub comments_url: String,
    /// Comment count reported by the listing, when present.
    #[serde(default)]
    pub comments: Option<u64>,
}

impl IssueItem {
    /// The issues endpoint also lists pull requests; those carry this key.
    pub fn is_pull_request(raw: &Value) -> bool {
        raw.get("pull_request").is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitItem {
    pub sha: Option<String>,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    pub date: DateTime<Utc>,
}

impl CommitItem {
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.commit.committer.as_ref().map(|c| c.date)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentItem {
    pub created_at: DateTime<Utc>,
}
