use thiserror::Error;

use crate::github::{FetchError, InvalidRepoId};

/// Failure that prevents any statistics for a repository.
#[derive(Debug, Clone, Error)]
pub enum StatsError {
    #[error(transparent)]
    InvalidRepository(#[from] InvalidRepoId),

    #[error("repository {repo} is unavailable: {source}")]
    RepositoryUnavailable {
        repo: String,
        #[source]
        source: FetchError,
    },
}
