//! Paginated search over a [`SearchTransport`].
//!
//! One term is paged sequentially: fetch a page (with retries), parse it,
//! merge its candidates into the shared [`Accumulator`], advance the cursor.
//! Several terms may page concurrently into the same accumulator; a term only
//! stops early on pages that repeat what that term itself already saw.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{Accumulator, Candidate, SearchError, SearchTransport};
use crate::download::{FailureType, RateLimiter, RetryDecision, RetryPolicy, parse_retry_after};
use crate::source::Provider;

/// Cursor advance per page; providers serve ten results per page.
pub const PAGE_STRIDE: usize = 10;

/// Default pause between successive page requests to one provider.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Why a term stopped paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The accumulator reached the result budget.
    BudgetReached,
    /// The provider returned a page with no entries, or repeated this term's results.
    Exhausted,
    /// A page request failed after retries.
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetReached => f.write_str("budget reached"),
            Self::Exhausted => f.write_str("results exhausted"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Summary of paging one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOutcome {
    /// Pages fetched successfully.
    pub pages: usize,
    /// Candidates this term contributed to the accumulator.
    pub accepted: usize,
    /// Why paging ended.
    pub stop: StopReason,
}

impl TermOutcome {
    /// True when the very first page request failed.
    #[must_use]
    pub fn failed_without_results(&self) -> bool {
        self.pages == 0 && matches!(self.stop, StopReason::Failed(_))
    }
}

/// Pages a provider transport with retry and inter-page spacing.
pub struct PaginatedSearch {
    transport: Arc<dyn SearchTransport>,
    retry_policy: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
}

impl fmt::Debug for PaginatedSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedSearch")
            .field("provider", &self.transport.provider())
            .field("endpoint", &self.transport.endpoint())
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl PaginatedSearch {
    /// Creates a search with the default retry policy and one-second page delay.
    #[must_use]
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport,
            retry_policy: RetryPolicy::default(),
            rate_limiter: Arc::new(RateLimiter::new(DEFAULT_PAGE_DELAY)),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replaces the limiter that spaces page requests.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Returns the provider being searched.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.transport.provider()
    }

    /// Searches one term and returns at most `max_results` unique candidates.
    pub async fn search(&self, term: &str, max_results: usize) -> Vec<Candidate> {
        let accumulator = Accumulator::with_cap(max_results);
        self.search_into(term, 0, &accumulator, max_results).await;
        accumulator.drain(max_results)
    }

    /// Pages `term` into a shared accumulator until the budget is met, the
    /// provider runs dry, or a page fails after retries.
    #[instrument(skip(self, accumulator), fields(provider = %self.transport.provider()))]
    pub async fn search_into(
        &self,
        term: &str,
        tag: usize,
        accumulator: &Accumulator,
        max_results: usize,
    ) -> TermOutcome {
        let mut offset = 0;
        let mut pages = 0;
        let mut accepted = 0;
        let mut seen: HashSet<Candidate> = HashSet::new();

        let stop = loop {
            if accumulator.size() >= max_results {
                break StopReason::BudgetReached;
            }

            let body = match self.fetch_with_retry(term, offset).await {
                Ok(body) => body,
                Err(error) => {
                    warn!(offset, error = %error, "search page failed, keeping accumulated results");
                    break StopReason::Failed(error.to_string());
                }
            };
            pages += 1;

            let page = self.transport.parse_page(&body);
            if page.is_empty() {
                debug!(offset, "empty page");
                break StopReason::Exhausted;
            }

            let fresh = page
                .candidates
                .iter()
                .filter(|candidate| seen.insert((*candidate).clone()))
                .count();
            if fresh == 0 && !page.candidates.is_empty() {
                debug!(offset, "page repeated this term's earlier results");
                break StopReason::Exhausted;
            }

            let added = accumulator.add_tagged(tag, page.candidates);
            accepted += added;
            debug!(
                offset,
                entries = page.entries,
                added,
                total = accumulator.size(),
                "merged page"
            );

            if accumulator.size() >= max_results {
                break StopReason::BudgetReached;
            }
            offset += PAGE_STRIDE;
        };

        info!(pages, accepted, stop = %stop, "term search finished");
        TermOutcome {
            pages,
            accepted,
            stop,
        }
    }

    async fn fetch_with_retry(&self, term: &str, offset: usize) -> Result<String, SearchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.rate_limiter.acquire(self.transport.endpoint()).await;

            let error = match self.transport.fetch_page(term, offset).await {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            let failure_type = error.failure_type();
            let retry_after = if failure_type == FailureType::RateLimited {
                error.retry_after().and_then(parse_retry_after)
            } else {
                None
            };

            match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay: backoff,
                    attempt: next_attempt,
                } => {
                    let delay = retry_after.unwrap_or(backoff);
                    info!(
                        offset,
                        attempt = next_attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying search page"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(offset, %reason, "giving up on search page");
                    return Err(error);
                }
            }
        }
    }
}
