#![allow(dead_code)]

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;

use ghstats::github::{FetchError, Fetcher, RawResponse, RetryPolicy, Transport};

pub const API: &str = "https://api.test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted transport: responses are queued per URL and served in order.
/// Unscripted URLs answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<RawResponse, FetchError>>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, resp: RawResponse) -> &Self {
        self.push_result(url, Ok(resp))
    }

    pub fn push_result(&self, url: &str, result: Result<RawResponse, FetchError>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send {
        self.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            params: params.to_vec(),
        });

        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(RawResponse::new(404, r#"{"message":"Not Found"}"#)));

        async move { next }
    }
}

/// No jitter and no pacing delays, so elapsed time is exactly the backoff.
pub fn test_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        backoff_base: 2,
        jitter: false,
        low_water_mark: 3,
        reset_margin: std::time::Duration::from_secs(1),
        request_delay: std::time::Duration::ZERO,
        page_delay: std::time::Duration::ZERO,
        comment_delay: std::time::Duration::ZERO,
    }
}

pub fn fetcher() -> Fetcher<MockTransport> {
    Fetcher::new(MockTransport::new(), test_policy())
}

pub fn ok(body: Value) -> RawResponse {
    RawResponse::new(200, body.to_string())
        .with_header("x-ratelimit-remaining", "4000")
        .with_header("x-ratelimit-reset", &Utc::now().timestamp().to_string())
}

pub fn ok_with_next(body: Value, next: &str) -> RawResponse {
    ok(body).with_header("link", &format!(r#"<{next}>; rel="next""#))
}

pub fn rate_limited(reset: DateTime<Utc>) -> RawResponse {
    RawResponse::new(
        403,
        r#"{"message":"API rate limit exceeded for user ID 1.","documentation_url":"https://docs.github.com"}"#,
    )
    .with_header("x-ratelimit-remaining", "0")
    .with_header("x-ratelimit-reset", &reset.timestamp().to_string())
}

pub fn abuse_detected() -> RawResponse {
    RawResponse::new(
        403,
        r#"{"message":"You have triggered an abuse detection mechanism. Please wait a few minutes before you try again."}"#,
    )
}

pub fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn days_ago(days: i64) -> String {
    ts(Utc::now() - Duration::days(days))
}

pub fn pulls_url(repo: &str) -> String {
    format!("{API}/repos/{repo}/pulls")
}

pub fn issues_url(repo: &str) -> String {
    format!("{API}/repos/{repo}/issues")
}

pub fn commits_url(repo: &str, number: u64) -> String {
    format!("{API}/repos/{repo}/pulls/{number}/commits")
}

pub fn comments_url(repo: &str, number: u64) -> String {
    format!("{API}/repos/{repo}/issues/{number}/comments")
}

pub fn pull_request(
    repo: &str,
    number: u64,
    created_at: &str,
    updated_at: &str,
    closed_at: Option<&str>,
) -> Value {
    serde_json::json!({
        "number": number,
        "created_at": created_at,
        "updated_at": updated_at,
        "closed_at": closed_at,
        "commits_url": commits_url(repo, number),
    })
}

pub fn issue(
    repo: &str,
    number: u64,
    created_at: &str,
    closed_at: Option<&str>,
    comments: u64,
) -> Value {
    serde_json::json!({
        "number": number,
        "created_at": created_at,
        "closed_at": closed_at,
        "comments": comments,
        "comments_url": comments_url(repo, number),
    })
}

pub fn commit(date: &str) -> Value {
    serde_json::json!({
        "sha": "abc123",
        "commit": { "committer": { "name": "dev", "date": date } },
    })
}

pub fn comment(created_at: &str) -> Value {
    serde_json::json!({ "id": 1, "created_at": created_at })
}
