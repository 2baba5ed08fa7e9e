//! Per-domain request spacing for provider quotas.
//!
//! A [`RateLimiter`] enforces a minimum delay between successive requests to
//! the same host. The paginated search uses it as its inter-page delay and
//! the fetcher uses it to space downloads. Requests to different hosts never
//! wait on each other.
//!
//! ```
//! use std::time::Duration;
//! use retriever_core::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_secs(1));
//! limiter.acquire("https://serpapi.com/search?start=0").await; // immediate
//! limiter.acquire("https://serpapi.com/search?start=10").await; // waits ~1s
//! limiter.acquire("https://www.ncbi.nlm.nih.gov/pmc/").await; // immediate
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Per-domain rate limiter, shared across tasks behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    /// Arc'd state lets the `DashMap` shard lock drop before awaiting the inner mutex.
    domains: DashMap<String, Arc<DomainState>>,
}

#[derive(Debug)]
struct DomainState {
    /// `None` until the first request; the first request never waits.
    last_request: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl DomainState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a limiter enforcing `delay` between requests to one domain.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        debug!(delay_ms = delay.as_millis(), "creating rate limiter");
        Self {
            delay,
            domains: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether the limiter applies no delay.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Waits until a request to `url`'s domain is allowed, then records it.
    #[instrument(skip(self), fields(domain))]
    pub async fn acquire(&self, url: &str) {
        if self.is_disabled() {
            return;
        }

        let domain = extract_domain(url);
        tracing::Span::current().record("domain", domain.as_str());

        let state = self
            .domains
            .entry(domain.clone())
            .or_insert_with(|| Arc::new(DomainState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(wait);
                debug!(
                    domain = %domain,
                    delay_ms = wait.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        domain = %domain,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive rate limiting for this provider"
                    );
                }
                tokio::time::sleep(wait).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

/// Extracts the lowercased host from a URL, or `"unknown"` when unparseable.
///
/// ```
/// use retriever_core::download::rate_limiter::extract_domain;
///
/// assert_eq!(extract_domain("https://SerpAPI.com/search"), "serpapi.com");
/// assert_eq!(extract_domain("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a Retry-After header (integer seconds or HTTP-date) into a delay.
///
/// Values above five minutes are capped; dates in the past yield zero.
///
/// ```
/// use std::time::Duration;
/// use retriever_core::download::rate_limiter::parse_retry_after;
///
/// assert_eq!(parse_retry_after("12"), Some(Duration::from_secs(12)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    let Ok(datetime) = httpdate::parse_http_date(header_value) else {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    };
    let delay = datetime
        .duration_since(std::time::SystemTime::now())
        .unwrap_or(Duration::ZERO);
    if delay > MAX_RETRY_AFTER {
        warn!(
            delay_secs = delay.as_secs(),
            "Retry-After exceeds maximum, capping"
        );
    }
    Some(delay.min(MAX_RETRY_AFTER))
}
