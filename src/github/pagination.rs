//! Page-by-page traversal of REST collections.

use serde_json::Value;
use tracing::{debug, warn};

use super::error::FetchError;
use super::fetcher::{Fetcher, ResponseMeta};
use super::transport::Transport;

/// Extract the `rel="next"` URL from a Link header.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/repositories/1/pulls?page=2>; rel="next", <...&page=9>; rel="last"`
pub fn parse_next_link(link_header: &str) -> Option<String> {
    for part in link_header.split(',') {
        let mut url = None;
        let mut is_next = false;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                is_next = rel_value
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel == "next");
            }
        }

        if is_next && let Some(url) = url {
            return Some(url.to_string());
        }
    }

    None
}

/// Continuation point after a page; `None` means the final page was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    next: Option<String>,
}

impl PageCursor {
    pub fn from_meta(meta: &ResponseMeta) -> Self {
        Self {
            next: meta.next_link.clone(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref()
    }
}

/// How successive pages are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    /// Follow the `rel="next"` URL verbatim.
    Link,
    /// Re-request the same URL with `page=1,2,...` while a next link exists.
    PageNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page carried no next link.
    Exhausted,
    /// A page came back empty.
    Empty,
    /// The API answered with an error object instead of a list.
    ApiError(String),
    /// The payload was neither a list nor an error object.
    Malformed,
    /// The request itself failed.
    Failed(FetchError),
}

/// Lazily walks one collection, one page per call to [`Paginator::next_page`].
pub struct Paginator<'a, T> {
    fetcher: &'a Fetcher<T>,
    url: String,
    params: Vec<(String, String)>,
    style: PageStyle,
    page: u32,
    pages_fetched: u32,
    stop: Option<StopReason>,
}

impl<'a, T: Transport> Paginator<'a, T> {
    pub fn new(
        fetcher: &'a Fetcher<T>,
        url: impl Into<String>,
        params: Vec<(String, String)>,
        style: PageStyle,
    ) -> Self {
        Self {
            fetcher,
            url: url.into(),
            params,
            style,
            page: 1,
            pages_fetched: 0,
            stop: None,
        }
    }

    /// Number of non-empty pages yielded so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }

    /// Fetch the next page. Returns `None` once the collection is finished,
    /// and keeps returning `None` afterwards.
    pub async fn next_page(&mut self) -> Option<Vec<Value>> {
        if self.stop.is_some() {
            return None;
        }

        let delay = self.fetcher.policy().page_delay;
        if self.pages_fetched > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let params = match self.style {
            PageStyle::Link if self.pages_fetched == 0 => self.params.clone(),
            PageStyle::Link => Vec::new(),
            PageStyle::PageNumber => {
                let mut params = self.params.clone();
                params.push(("page".to_string(), self.page.to_string()));
                params
            }
        };

        debug!(url = %self.url, page = self.page, "Fetching page");
        let (payload, meta) = match self.fetcher.fetch(&self.url, &params).await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.stop = Some(StopReason::Failed(err));
                return None;
            }
        };

        let items = match payload {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            Value::Object(map) if map.contains_key("message") => {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                warn!(url = %self.url, page = self.page, message = %message, "API returned an error");
                self.stop = Some(StopReason::ApiError(message));
                return None;
            }
            _ => {
                warn!(url = %self.url, page = self.page, "Unexpected page payload, expected a list");
                self.stop = Some(StopReason::Malformed);
                return None;
            }
        };

        if items.is_empty() {
            self.stop = Some(StopReason::Empty);
            return None;
        }

        self.pages_fetched += 1;
        let cursor = PageCursor::from_meta(&meta);
        if !cursor.has_more() {
            self.stop = Some(StopReason::Exhausted);
            return Some(items);
        }

        if self.style == PageStyle::Link
            && let Some(next) = cursor.next_url()
        {
            self.url = next.to_string();
        }
        self.page += 1;

        Some(items)
    }
}
