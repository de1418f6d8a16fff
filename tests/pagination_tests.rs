mod common;

use serde_json::{Value, json};

use common::*;
use ghstats::github::{FetchError, PageStyle, Paginator, StopReason};

const URL: &str = "https://api.test/repos/o/r/pulls";

fn items(range: std::ops::Range<u64>) -> Value {
    Value::Array(range.map(|id| json!({ "id": id })).collect())
}

fn listing() -> Vec<(String, String)> {
    vec![
        ("state".to_string(), "all".to_string()),
        ("per_page".to_string(), "100".to_string()),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_three_full_pages_then_stop() {
    let fetcher = fetcher();
    let page2 = format!("{URL}?state=all&per_page=100&page=2");
    let page3 = format!("{URL}?state=all&per_page=100&page=3");
    fetcher
        .transport()
        .push(URL, ok_with_next(items(0..100), &page2))
        .push(&page2, ok_with_next(items(100..200), &page3))
        .push(&page3, ok(items(200..300)));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    let mut seen = 0;
    while let Some(page) = pages.next_page().await {
        assert_eq!(page.len(), 100);
        seen += page.len();
    }

    assert_eq!(seen, 300);
    assert_eq!(pages.pages_fetched(), 3);
    assert_eq!(pages.stop_reason(), Some(&StopReason::Exhausted));

    let requests = fetcher.transport().requests();
    assert_eq!(requests.len(), 3, "a fourth request must never be issued");
    assert_eq!(requests[0].param("state"), Some("all"));
    // Next links already carry the query string
    assert!(requests[1].params.is_empty());
    assert_eq!(requests[2].url, page3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_paginator_issues_no_more_requests() {
    let fetcher = fetcher();
    fetcher.transport().push(URL, ok(items(0..2)));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert!(pages.next_page().await.is_some());
    assert!(pages.next_page().await.is_none());
    assert!(pages.next_page().await.is_none());
    assert_eq!(fetcher.transport().requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_object_stops_without_failing() {
    let fetcher = fetcher();
    fetcher
        .transport()
        .push(URL, ok(json!({ "message": "Git Repository is empty." })));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert!(pages.next_page().await.is_none());
    assert_eq!(
        pages.stop_reason(),
        Some(&StopReason::ApiError("Git Repository is empty.".to_string()))
    );
    assert_eq!(pages.pages_fetched(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_payload_is_malformed() {
    let fetcher = fetcher();
    fetcher.transport().push(URL, ok(json!("just a string")));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert!(pages.next_page().await.is_none());
    assert_eq!(pages.stop_reason(), Some(&StopReason::Malformed));
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_stops_even_with_next_link() {
    let fetcher = fetcher();
    fetcher
        .transport()
        .push(URL, ok_with_next(json!([]), "https://api.test/next"));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert!(pages.next_page().await.is_none());
    assert_eq!(pages.stop_reason(), Some(&StopReason::Empty));
    assert_eq!(fetcher.transport().requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_mid_collection() {
    let fetcher = fetcher();
    let page2 = format!("{URL}?page=2");
    fetcher
        .transport()
        .push(URL, ok_with_next(items(0..100), &page2));
    // page2 is unscripted and answers 404

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert!(pages.next_page().await.is_some());
    assert!(pages.next_page().await.is_none());
    assert_eq!(pages.pages_fetched(), 1);
    assert!(matches!(
        pages.stop_reason(),
        Some(StopReason::Failed(FetchError::Http { status: 404, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_page_number_style_increments_by_one() {
    let fetcher = fetcher();
    let commits = "https://api.test/repos/o/r/pulls/7/commits";
    fetcher
        .transport()
        .push(commits, ok_with_next(items(0..100), "https://api.test/ignored?page=2"))
        .push(commits, ok_with_next(items(100..200), "https://api.test/ignored?page=3"))
        .push(commits, ok(items(200..250)));

    let per_page = vec![("per_page".to_string(), "100".to_string())];
    let mut pages = Paginator::new(&fetcher, commits, per_page, PageStyle::PageNumber);
    let mut total = 0;
    while let Some(page) = pages.next_page().await {
        total += page.len();
    }

    assert_eq!(total, 250);
    let requests = fetcher.transport().requests();
    let page_params: Vec<_> = requests.iter().map(|r| r.param("page")).collect();
    assert_eq!(page_params, vec![Some("1"), Some("2"), Some("3")]);
    assert!(requests.iter().all(|r| r.url == commits));
    assert!(requests.iter().all(|r| r.param("per_page") == Some("100")));
}

#[tokio::test(start_paused = true)]
async fn test_last_page_marks_exhausted_before_next_call() {
    let fetcher = fetcher();
    let page2 = format!("{URL}?page=2");
    fetcher
        .transport()
        .push(URL, ok_with_next(items(0..100), &page2))
        .push(&page2, ok(items(100..150)));

    let mut pages = Paginator::new(&fetcher, URL, listing(), PageStyle::Link);
    assert_eq!(pages.next_page().await.map(|p| p.len()), Some(100));
    assert_eq!(pages.stop_reason(), None);

    assert_eq!(pages.next_page().await.map(|p| p.len()), Some(50));
    assert_eq!(pages.stop_reason(), Some(&StopReason::Exhausted));
    assert_eq!(fetcher.transport().requests().len(), 2);
}
