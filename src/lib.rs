pub mod github;
pub mod report;
pub mod stats;
pub mod util;
