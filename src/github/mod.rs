pub mod auth;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pagination;
pub mod transport;

pub use auth::Credential;
pub use error::FetchError;
pub use fetcher::{FetchOutcome, Fetcher, ResponseMeta, RetryPolicy};
pub use models::*;
pub use pagination::{PageCursor, PageStyle, Paginator, StopReason};
pub use transport::{RawResponse, ReqwestTransport, Transport};
