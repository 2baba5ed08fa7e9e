//! Single-candidate PDF fetcher.
//!
//! A [`Fetcher`] turns one [`Candidate`] into a file on disk. Each attempt
//! waits on the per-domain rate limiter, resolves the candidate through the
//! provider's [`PdfLocator`], and streams the PDF with [`HttpClient`].
//! Transient failures are retried under the shared [`RetryPolicy`]. Every
//! outcome, including failure, is reported as a [`DownloadRecord`]; a single
//! bad candidate never aborts the batch it belongs to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, PdfRequest};
use super::constants::DEFAULT_DOWNLOAD_DELAY;
use super::error::DownloadError;
use super::filename::pdf_file_name;
use super::rate_limiter::{RateLimiter, parse_retry_after};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::resolver::{LocatedPdf, PdfLocator, ResolveError};
use crate::search::Candidate;
use crate::source::Provider;

/// Outcome of fetching one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    /// The PDF was downloaded and accepted.
    Success {
        /// Bytes written to disk.
        bytes: u64,
    },
    /// A sufficiently large file was already present; nothing was requested.
    SkippedExisting,
    /// The candidate could not be fetched.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Per-candidate download result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    /// The candidate that was fetched.
    pub candidate: Candidate,
    /// Where the PDF lives (or would have lived, for failures).
    pub path: PathBuf,
    /// Attempts made (0 when the file already existed).
    pub attempts: u32,
    /// What happened.
    #[serde(flatten)]
    pub status: DownloadStatus,
}

impl DownloadRecord {
    /// Returns whether a PDF for this candidate is on disk.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        matches!(
            self.status,
            DownloadStatus::Success { .. } | DownloadStatus::SkippedExisting
        )
    }

    fn failed(candidate: &Candidate, path: PathBuf, attempts: u32, reason: String) -> Self {
        Self {
            candidate: candidate.clone(),
            path,
            attempts,
            status: DownloadStatus::Failed { reason },
        }
    }
}

/// Failure of a single locate-then-download attempt.
#[derive(Debug)]
enum AttemptError {
    Resolve(ResolveError),
    Download(DownloadError),
}

impl AttemptError {
    fn failure_type(&self) -> FailureType {
        match self {
            Self::Resolve(e) => e.failure_type(),
            Self::Download(e) => classify_error(e),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        let header = match self {
            Self::Resolve(e) => e.retry_after(),
            Self::Download(e) => e.retry_after(),
        }?;
        parse_retry_after(header)
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "{e}"),
            Self::Download(e) => write!(f, "{e}"),
        }
    }
}

/// Downloads PDFs for one provider's candidates.
pub struct Fetcher {
    provider: Provider,
    client: HttpClient,
    locator: Arc<dyn PdfLocator>,
    retry_policy: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("provider", &self.provider)
            .field("locator", &self.locator.name())
            .field("retry_policy", &self.retry_policy)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher with the default retry policy and download spacing.
    #[must_use]
    pub fn new(provider: Provider, client: HttpClient, locator: Arc<dyn PdfLocator>) -> Self {
        Self {
            provider,
            client,
            locator,
            retry_policy: RetryPolicy::default(),
            rate_limiter: Arc::new(RateLimiter::new(DEFAULT_DOWNLOAD_DELAY)),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replaces the rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Returns the provider whose candidates this fetcher handles.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the destination path a candidate is written to inside `dir`.
    #[must_use]
    pub fn destination_for(&self, candidate: &Candidate, dir: &Path) -> PathBuf {
        dir.join(pdf_file_name(self.provider, candidate))
    }

    /// Fetches `candidate` into `dir`, never failing the caller.
    #[instrument(skip(self, dir), fields(provider = %self.provider, candidate = %candidate))]
    pub async fn fetch(&self, candidate: &Candidate, dir: &Path) -> DownloadRecord {
        let destination = self.destination_for(candidate, dir);

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            let error = DownloadError::io(dir, e);
            warn!(error = %error, "cannot create destination directory");
            return DownloadRecord::failed(candidate, destination, 0, error.to_string());
        }

        if let Ok(metadata) = tokio::fs::metadata(&destination).await
            && metadata.is_file()
            && metadata.len() > self.client.min_bytes()
        {
            debug!(
                path = %destination.display(),
                bytes = metadata.len(),
                "file already present, skipping"
            );
            return DownloadRecord {
                candidate: candidate.clone(),
                path: destination,
                attempts: 0,
                status: DownloadStatus::SkippedExisting,
            };
        }

        let mut located: Option<LocatedPdf> = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = self
                .attempt(candidate, &destination, &mut located)
                .await;

            let error = match result {
                Ok(bytes) => {
                    info!(path = %destination.display(), bytes, attempt, "stored PDF");
                    return DownloadRecord {
                        candidate: candidate.clone(),
                        path: destination,
                        attempts: attempt,
                        status: DownloadStatus::Success { bytes },
                    };
                }
                Err(error) => error,
            };

            let failure_type = error.failure_type();
            let retry_after = if failure_type == FailureType::RateLimited {
                error.retry_after()
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
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        using_retry_after = retry_after.is_some(),
                        error = %error,
                        "retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(error = %error, attempts = attempt, %reason, "fetch failed");
                    return DownloadRecord::failed(
                        candidate,
                        destination,
                        attempt,
                        error.to_string(),
                    );
                }
            }
        }
    }

    async fn attempt(
        &self,
        candidate: &Candidate,
        destination: &Path,
        located: &mut Option<LocatedPdf>,
    ) -> Result<u64, AttemptError> {
        let target = match located {
            Some(target) => target.clone(),
            None => {
                if let Some(page) = self.locator.landing_page(candidate) {
                    self.rate_limiter.acquire(&page).await;
                }
                let target = self
                    .locator
                    .locate(candidate)
                    .await
                    .map_err(AttemptError::Resolve)?;
                debug!(url = %target.url, "located PDF");
                *located = Some(target.clone());
                target
            }
        };

        self.rate_limiter.acquire(&target.url).await;
        let request = PdfRequest {
            referer: target.referer.as_deref(),
            user_agent: target.user_agent,
        };
        self.client
            .download_pdf(&target.url, destination, &request)
            .await
            .map_err(AttemptError::Download)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_record_serializes_status_inline() {
        let record = DownloadRecord {
            candidate: Candidate::new("PMC1"),
            path: PathBuf::from("download/PubMed/x/PMC1.pdf"),
            attempts: 1,
            status: DownloadStatus::Success { bytes: 2048 },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["bytes"], 2048);
        assert_eq!(json["candidate"], "PMC1");
    }

    #[test]
    fn test_failed_record_is_not_stored() {
        let record = DownloadRecord::failed(
            &Candidate::new("PMC2"),
            PathBuf::from("x.pdf"),
            3,
            "HTTP 404".to_string(),
        );
        assert!(!record.is_stored());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 404");
    }

    #[test]
    fn test_skipped_record_is_stored() {
        let record = DownloadRecord {
            candidate: Candidate::new("PMC3"),
            path: PathBuf::from("PMC3.pdf"),
            attempts: 0,
            status: DownloadStatus::SkippedExisting,
        };
        assert!(record.is_stored());
        assert_eq!(
            serde_json::to_value(&record).unwrap()["status"],
            "skipped_existing"
        );
    }
}
