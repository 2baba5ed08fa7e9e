//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use retriever_core::{HttpClient, HttpTimeouts, RateLimiter, RetryPolicy};

/// Three attempts with millisecond backoff and no jitter.
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0)
        .with_max_jitter(Duration::ZERO)
}

/// A limiter that never sleeps.
pub fn no_delay() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::disabled())
}

/// Client with short timeouts for mock servers.
pub fn test_client() -> HttpClient {
    HttpClient::with_timeouts(HttpTimeouts::uniform(5)).expect("client should build")
}

/// A body large enough to pass the minimum PDF size check.
pub fn pdf_body() -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.resize(2048, b'x');
    body
}

/// A PMC search results page listing `ids`.
pub fn pmc_results_page(ids: &[&str]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="rslt"><p class="title"><a href="/pmc/articles/{id}/">Article {id}</a></p></div>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"results\">{entries}</div></body></html>")
}

/// A PMC article landing page with a format-menu PDF link.
pub fn pmc_landing_page(id: &str) -> String {
    format!(
        r#"<html><body><div class="format-menu"><ul><li><a href="/pmc/articles/{id}/pdf/article.pdf">PDF (512K)</a></li></ul></div></body></html>"#
    )
}

/// A SerpAPI Google Scholar response with one PDF resource per link.
pub fn scholar_response(links: &[String]) -> String {
    let results: Vec<serde_json::Value> = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            serde_json::json!({
                "position": i,
                "title": format!("Result {i}"),
                "resources": [
                    {"title": "example.org", "file_format": "PDF", "link": link}
                ]
            })
        })
        .collect();
    serde_json::json!({ "organic_results": results }).to_string()
}
