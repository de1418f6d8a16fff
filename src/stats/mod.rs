pub mod aggregator;
pub mod error;
pub mod models;
pub mod runner;

pub use aggregator::WindowedAggregator;
pub use error::StatsError;
pub use models::{RepoOutcome, RepoStats, RunSummary, SummaryTotals};
pub use runner::{RepoState, RepositoryStatsRunner};
