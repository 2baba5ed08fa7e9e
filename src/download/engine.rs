//! Bounded worker pool for fetching many candidates concurrently.
//!
//! The [`DownloadEngine`] runs one Tokio task per [`FetchJob`], gated by a
//! semaphore, and hands every job to a shared [`Fetcher`]. Results come back
//! in job order regardless of completion order.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use retriever_core::download::{DownloadEngine, FetchJob, Fetcher, HttpClient};
//! use retriever_core::resolver::PmcLocator;
//! use retriever_core::{Candidate, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let locator = Arc::new(PmcLocator::new(client.inner().clone()));
//! let fetcher = Arc::new(Fetcher::new(Provider::PubMed, client, locator));
//! let engine = DownloadEngine::new(4)?;
//! let jobs = vec![FetchJob::new(Candidate::new("PMC1234567"), PathBuf::from("download/PubMed/x"))];
//! let report = engine.fetch_all(fetcher, jobs).await?;
//! println!("Completed: {}, Failed: {}", report.stats.completed(), report.stats.failed());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::fetcher::{DownloadRecord, DownloadStatus, Fetcher};
use crate::search::Candidate;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 16;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Counters for one batch; updated atomically by the worker tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of freshly downloaded PDFs.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of candidates whose file already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of failed candidates.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of retry attempts made across the batch.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns the total number of candidates processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.skipped() + self.failed()
    }

    fn record(&self, record: &DownloadRecord) {
        match record.status {
            DownloadStatus::Success { .. } => self.completed.fetch_add(1, Ordering::SeqCst),
            DownloadStatus::SkippedExisting => self.skipped.fetch_add(1, Ordering::SeqCst),
            DownloadStatus::Failed { .. } => self.failed.fetch_add(1, Ordering::SeqCst),
        };
        let retries = record.attempts.saturating_sub(1) as usize;
        if retries > 0 {
            self.retried.fetch_add(retries, Ordering::SeqCst);
        }
    }
}

/// One unit of work: a candidate and the directory it belongs in.
#[derive(Debug, Clone)]
pub struct FetchJob {
    /// Candidate to fetch.
    pub candidate: Candidate,
    /// Directory the PDF is written to.
    pub destination_dir: PathBuf,
}

impl FetchJob {
    /// Creates a job.
    #[must_use]
    pub fn new(candidate: Candidate, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            candidate,
            destination_dir: destination_dir.into(),
        }
    }
}

/// Records plus counters from one [`DownloadEngine::fetch_all`] call.
#[derive(Debug)]
pub struct BatchReport {
    /// One record per job, in job order.
    pub records: Vec<DownloadRecord>,
    /// Aggregate counters.
    pub stats: DownloadStats,
}

/// Semaphore-bounded worker pool.
///
/// - Each fetch runs in its own Tokio task
/// - A permit is acquired before a task is spawned and released when it ends
/// - A panicking task becomes a failed record instead of aborting the batch
#[derive(Debug)]
pub struct DownloadEngine {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl DownloadEngine {
    /// Creates an engine running at most `concurrency` fetches at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-16).
    ///
    /// ```
    /// use retriever_core::download::DownloadEngine;
    ///
    /// assert!(DownloadEngine::new(4).is_ok());
    /// assert!(DownloadEngine::new(0).is_err());
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        debug!(concurrency, "creating download engine");
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches every job and returns one record per job, in job order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    /// Individual fetch failures are reported in the records, not as errors.
    #[instrument(skip(self, fetcher, jobs), fields(provider = %fetcher.provider(), jobs = jobs.len()))]
    pub async fn fetch_all(
        &self,
        fetcher: Arc<Fetcher>,
        jobs: Vec<FetchJob>,
    ) -> Result<BatchReport, EngineError> {
        let stats = Arc::new(DownloadStats::new());
        let mut handles = Vec::with_capacity(jobs.len());

        info!("starting batch");

        for job in jobs {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let fetcher = Arc::clone(&fetcher);
            let stats = Arc::clone(&stats);
            let fallback = (
                job.candidate.clone(),
                fetcher.destination_for(&job.candidate, &job.destination_dir),
            );

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let record = fetcher.fetch(&job.candidate, &job.destination_dir).await;
                stats.record(&record);
                record
            });
            handles.push((handle, fallback));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (handle, (candidate, path)) in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, candidate = %candidate, "fetch task panicked");
                    let record = DownloadRecord {
                        candidate,
                        path,
                        attempts: 0,
                        status: DownloadStatus::Failed {
                            reason: format!("fetch task failed: {e}"),
                        },
                    };
                    stats.record(&record);
                    records.push(record);
                }
            }
        }

        info!(
            completed = stats.completed(),
            skipped = stats.skipped(),
            failed = stats.failed(),
            retried = stats.retried(),
            "batch complete"
        );

        let stats = Arc::try_unwrap(stats).unwrap_or_else(|shared| {
            let copy = DownloadStats::new();
            copy.completed.store(shared.completed(), Ordering::SeqCst);
            copy.skipped.store(shared.skipped(), Ordering::SeqCst);
            copy.failed.store(shared.failed(), Ordering::SeqCst);
            copy.retried.store(shared.retried(), Ordering::SeqCst);
            copy
        });

        Ok(BatchReport { records, stats })
    }
}
