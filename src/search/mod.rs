//! Provider search: transports, link extraction, pagination, deduplication.
//!
//! # Architecture
//!
//! - [`SearchTransport`] - Async trait that fetches one raw results page and
//!   knows how to parse it into a [`ResultPage`]
//! - [`ScholarSearch`] / [`PubMedSearch`] - The two production transports
//! - [`PaginatedSearch`] - Cursor loop with retry and inter-page delay
//! - [`Accumulator`] - Shared, capped, insertion-ordered unique set

mod accumulator;
mod candidate;
mod error;
pub mod extract;
mod paginate;
mod pubmed;
mod scholar;

pub use accumulator::Accumulator;
pub use candidate::Candidate;
pub use error::SearchError;
pub use extract::{
    ResultPage, extract_pmcids, extract_scholar_pdf_links, parse_pmc_page, parse_scholar_page,
};
pub use paginate::{DEFAULT_PAGE_DELAY, PAGE_STRIDE, PaginatedSearch, StopReason, TermOutcome};
pub use pubmed::{DEFAULT_PUBMED_SEARCH_URL, PubMedSearch};
pub use scholar::{DEFAULT_SCHOLAR_ENDPOINT, ScholarSearch};

use async_trait::async_trait;

use crate::source::Provider;

/// A provider's page-level search API.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// The provider this transport talks to.
    fn provider(&self) -> Provider;

    /// Base URL of the search endpoint; also the rate-limiting key.
    fn endpoint(&self) -> &str;

    /// Fetches the raw page starting at result `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure or a non-success status.
    async fn fetch_page(&self, query: &str, offset: usize) -> Result<String, SearchError>;

    /// Parses a raw page into its entry count and candidates. Never fails.
    fn parse_page(&self, body: &str) -> ResultPage;
}
