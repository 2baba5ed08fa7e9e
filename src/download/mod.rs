//! PDF download pipeline: streaming client, fetcher, retry, rate limiting.
//!
//! # Features
//!
//! - Streaming downloads into a `.part` file, promoted only once accepted
//! - Content-type and minimum-size validation
//! - Exponential backoff on transient failures, honoring Retry-After
//! - Per-domain request spacing
//! - Bounded concurrent worker pool

pub mod client;
mod constants;
mod engine;
mod error;
mod fetcher;
pub mod filename;
pub mod rate_limiter;
mod retry;

pub use client::{HttpClient, PdfRequest, is_pdf_content_type};
pub use constants::{DEFAULT_DOWNLOAD_DELAY, MIN_PDF_BYTES};
pub use engine::{
    BatchReport, DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, EngineError, FetchJob,
};
pub use error::DownloadError;
pub use fetcher::{DownloadRecord, DownloadStatus, Fetcher};
pub use rate_limiter::{RateLimiter, extract_domain, parse_retry_after};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    classify_http_status, classify_network_error,
};
