//! Article Retriever Core Library
//!
//! This library searches Google Scholar (through SerpAPI) and PubMed Central
//! for articles, downloads the matching PDFs, and files them under a
//! deterministic, search-term-scoped directory layout.
//!
//! # Architecture
//!
//! The pipeline runs leaf-first through these modules:
//! - [`search`] - Provider transports, link extraction, paginated search, deduplication
//! - [`resolver`] - Resolution of candidates into downloadable PDF URLs
//! - [`download`] - Streaming PDF fetcher, retry policy, rate limiting, worker pool
//! - [`storage`] - Directory layout, sequential renaming, search history
//! - [`retrieval`] - Orchestration of the whole pipeline per source

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod http_client;
pub mod resolver;
pub mod retrieval;
pub mod search;
pub mod source;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DownloadEngine, DownloadError, DownloadRecord,
    DownloadStatus, Fetcher, HttpClient, RateLimiter, RetryPolicy,
};
pub use http_client::HttpTimeouts;
pub use resolver::{DirectLocator, PdfLocator, PmcLocator, ResolveError};
pub use retrieval::{
    RetrievalError, RetrievalRequest, RetrievalSummary, Retriever, RetrieverSettings,
};
pub use search::{Accumulator, Candidate, PaginatedSearch, SearchError, SearchTransport};
pub use source::{Provider, SourceSelection};
pub use storage::{JsonFileHistory, RenameReport, SearchHistory, SearchTerm, StorageLayout};
