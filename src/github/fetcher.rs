//! Rate-limit aware request execution.
//!
//! Every request goes through [`Fetcher::fetch`], which classifies each
//! attempt, sleeps out rate limits and secondary limits, and throttles itself
//! when the remaining quota drops below the low-water mark.

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::FetchError;
use super::pagination::parse_next_link;
use super::transport::{RawResponse, Transport};
use crate::util::progress::sleep_with_progress;
use crate::util::time::format_wait;

/// Upper bound on a single backoff term.
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Retry, backoff and pacing knobs shared by every request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per logical request, including the first.
    pub max_attempts: u32,
    /// Backoff is `backoff_base ^ attempt` seconds.
    pub backoff_base: u32,
    /// Add up to one second of random jitter to backoff waits.
    pub jitter: bool,
    /// Sleep until reset once remaining quota falls below this.
    pub low_water_mark: u32,
    pub reset_margin: Duration,
    /// Pause after every successful request.
    pub request_delay: Duration,
    /// Pause between pages of one collection.
    pub page_delay: Duration,
    /// Pause after each issue comment request.
    pub comment_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: 2,
            jitter: true,
            low_water_mark: 3,
            reset_margin: Duration::from_secs(1),
            request_delay: Duration::from_millis(100),
            page_delay: Duration::from_millis(500),
            comment_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for a zero-based attempt number.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = u64::from(self.backoff_base).saturating_pow(attempt);
        let mut wait = Duration::from_secs(secs).min(MAX_BACKOFF);
        if self.jitter {
            wait += Duration::from_millis(rand::rng().random_range(0..1000));
        }
        wait
    }
}

/// Rate-limit and pagination headers of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
    pub next_link: Option<String>,
}

impl ResponseMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok())
        };

        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0));

        let next_link = headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        Self {
            limit: number("x-ratelimit-limit"),
            remaining: number("x-ratelimit-remaining"),
            reset_at,
            next_link,
        }
    }
}

/// Classification of a single HTTP attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Success { payload: Value, meta: ResponseMeta },
    RetryableFailure { reason: String, wait: Duration },
    FatalFailure(FetchError),
}

pub struct Fetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue one logical GET, retrying rate-limited attempts.
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<(Value, ResponseMeta), FetchError> {
        for attempt in 0..self.policy.max_attempts {
            let result = self.transport.get(url, params).await;
            match self.classify(result, attempt, Utc::now()) {
                FetchOutcome::Success { payload, meta } => {
                    debug!(url, remaining = ?meta.remaining, "Fetched");
                    self.pace(&meta).await;
                    return Ok((payload, meta));
                }
                FetchOutcome::RetryableFailure { reason, wait } => {
                    if attempt + 1 == self.policy.max_attempts {
                        warn!(url, attempt = attempt + 1, "{}", reason);
                        break;
                    }
                    warn!(
                        url,
                        attempt = attempt + 1,
                        "{}. Retrying in {}",
                        reason,
                        format_wait(wait)
                    );
                    sleep_with_progress(wait).await;
                }
                FetchOutcome::FatalFailure(err) => {
                    error!(url, error = %err, "Request failed");
                    return Err(err);
                }
            }
        }

        error!(url, "Max retries reached. Unable to fetch data");
        Err(FetchError::MaxRetries {
            attempts: self.policy.max_attempts,
        })
    }

    /// Decide what a single attempt means. `attempt` is zero-based.
    pub fn classify(
        &self,
        result: Result<RawResponse, FetchError>,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> FetchOutcome {
        let resp = match result {
            Ok(resp) => resp,
            Err(err) => return FetchOutcome::FatalFailure(err),
        };

        if resp.is_success() {
            return match serde_json::from_str::<Value>(&resp.body) {
                Ok(payload) => FetchOutcome::Success {
                    payload,
                    meta: ResponseMeta::from_headers(&resp.headers),
                },
                Err(e) => FetchOutcome::FatalFailure(FetchError::Decode(e.to_string())),
            };
        }

        if matches!(resp.status, 403 | 429) {
            let body = resp.body.to_lowercase();
            let meta = ResponseMeta::from_headers(&resp.headers);

            if body.contains("abuse detection") || body.contains("secondary rate limit") {
                let mut wait = self.policy.backoff(attempt);
                if let Some(retry_after) = retry_after(&resp) {
                    wait = wait.max(retry_after);
                }
                return FetchOutcome::RetryableFailure {
                    reason: "Abuse detection triggered".to_string(),
                    wait,
                };
            }

            if body.contains("rate limit exceeded") || meta.remaining == Some(0) {
                let until_reset = meta
                    .reset_at
                    .map(|reset| duration_until(reset, now))
                    .unwrap_or_default();
                return FetchOutcome::RetryableFailure {
                    reason: "Rate limit exceeded".to_string(),
                    wait: until_reset + self.policy.backoff(attempt),
                };
            }
        }

        FetchOutcome::FatalFailure(FetchError::Http {
            status: resp.status,
            message: api_message(&resp.body),
        })
    }

    /// Throttle after a success: wait out the reset window when quota is low,
    /// otherwise pause for the fixed inter-request delay.
    async fn pace(&self, meta: &ResponseMeta) {
        if let Some(remaining) = meta.remaining
            && remaining < self.policy.low_water_mark
        {
            let until_reset = meta
                .reset_at
                .map(|reset| duration_until(reset, Utc::now()))
                .unwrap_or_default();
            let wait = until_reset + self.policy.reset_margin;
            warn!(
                remaining,
                limit = ?meta.limit,
                "Rate limit low. Sleeping for {}",
                format_wait(wait)
            );
            sleep_with_progress(wait).await;
            return;
        }

        if !self.policy.request_delay.is_zero() {
            tokio::time::sleep(self.policy.request_delay).await;
        }
    }
}

/// Time from `now` until `reset`, floored at zero.
fn duration_until(reset: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (reset - now).to_std().unwrap_or_default()
}

fn retry_after(resp: &RawResponse) -> Option<Duration> {
    resp.header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// The `message` field of a GitHub error body, or the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
