//! End-to-end retrieval: search, fetch, and file PDFs per source.
//!
//! For each provider the request covers, [`Retriever::retrieve`]:
//!
//! 1. pages every term concurrently into one capped [`Accumulator`]
//! 2. fetches each candidate into the directory of the term that found it
//! 3. renames each term directory's PDFs into a `{term}{n}.pdf` sequence
//!
//! Partial success is a normal result. Only request validation and "every
//! requested source failed" are errors.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::download::{
    DEFAULT_CONCURRENCY, DEFAULT_DOWNLOAD_DELAY, DownloadEngine, DownloadError, DownloadRecord,
    EngineError, FetchJob, Fetcher, HttpClient, RateLimiter, RetryPolicy,
};
use crate::http_client::HttpTimeouts;
use crate::resolver::{DEFAULT_PMC_BASE_URL, DirectLocator, PmcLocator};
use crate::search::{
    Accumulator, Candidate, DEFAULT_PAGE_DELAY, DEFAULT_PUBMED_SEARCH_URL,
    DEFAULT_SCHOLAR_ENDPOINT, PaginatedSearch, PubMedSearch, ScholarSearch, StopReason,
    TermOutcome,
};
use crate::source::{Provider, SourceSelection};
use crate::storage::{DEFAULT_OUTPUT_DIR, SearchTerm, StorageLayout, rename_pdfs};

/// Largest accepted `max_results`.
pub const MAX_RESULTS_LIMIT: usize = 100;

/// A retrieval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Search terms; blank entries are ignored.
    pub terms: Vec<String>,
    /// Source(s) to search.
    pub source: SourceSelection,
    /// Total result budget, 1..=100.
    pub max_results: usize,
}

impl RetrievalRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(terms: Vec<String>, source: SourceSelection, max_results: usize) -> Self {
        Self {
            terms,
            source,
            max_results,
        }
    }

    /// Validates the request and returns the normalized terms.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidMaxResults`] or
    /// [`RetrievalError::NoSearchTerms`].
    pub fn validate(&self) -> Result<Vec<SearchTerm>, RetrievalError> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results) {
            return Err(RetrievalError::InvalidMaxResults {
                value: self.max_results,
            });
        }
        let terms: Vec<SearchTerm> = self
            .terms
            .iter()
            .map(|t| t.as_str().trim())
            .filter(|t| !t.is_empty())
            .map(SearchTerm::new)
            .collect();
        if terms.is_empty() {
            return Err(RetrievalError::NoSearchTerms);
        }
        Ok(terms)
    }
}

/// Result of a retrieval run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalSummary {
    /// Candidates found on Google Scholar.
    pub google_scholar: Vec<Candidate>,
    /// Candidates found on PubMed.
    pub pubmed: Vec<Candidate>,
    /// One record per fetched candidate, paths reflecting renames.
    pub stored_pdfs: Vec<DownloadRecord>,
}

impl RetrievalSummary {
    /// Candidates found for `provider`.
    #[must_use]
    pub fn candidates(&self, provider: Provider) -> &[Candidate] {
        match provider {
            Provider::Scholar => &self.google_scholar,
            Provider::PubMed => &self.pubmed,
        }
    }

    /// Number of PDFs on disk after the run.
    #[must_use]
    pub fn stored_count(&self) -> usize {
        self.stored_pdfs.iter().filter(|r| r.is_stored()).count()
    }
}

/// Errors surfaced by [`Retriever`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// `max_results` outside 1..=100.
    #[error("max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {value}")]
    InvalidMaxResults {
        /// The rejected value.
        value: usize,
    },

    /// No usable search term.
    #[error("at least one non-empty search term is required")]
    NoSearchTerms,

    /// Every requested source failed before producing results.
    #[error("every requested source failed: {details}")]
    AllSourcesFailed {
        /// Per-source failure descriptions.
        details: String,
    },

    /// Download engine setup or execution failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// HTTP client construction failed.
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] DownloadError),
}

impl RetrievalError {
    /// True for errors caused by the request rather than the environment.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidMaxResults { .. } | Self::NoSearchTerms)
    }
}

/// Tunables for [`Retriever::new`].
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    /// Storage root.
    pub output_dir: PathBuf,
    /// SerpAPI key; Scholar searches fail without one.
    pub serpapi_key: Option<String>,
    /// SerpAPI endpoint.
    pub scholar_endpoint: String,
    /// PMC search endpoint.
    pub pubmed_search_url: String,
    /// PMC base URL for landing pages.
    pub pmc_base_url: String,
    /// Concurrent fetches, 1..=16.
    pub concurrency: usize,
    /// Delay between page requests to one provider.
    pub page_delay: Duration,
    /// Delay between download requests to one host.
    pub download_delay: Duration,
    /// Retry policy for pages and downloads.
    pub retry_policy: RetryPolicy,
    /// HTTP timeouts.
    pub timeouts: HttpTimeouts,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            serpapi_key: None,
            scholar_endpoint: DEFAULT_SCHOLAR_ENDPOINT.to_string(),
            pubmed_search_url: DEFAULT_PUBMED_SEARCH_URL.to_string(),
            pmc_base_url: DEFAULT_PMC_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            page_delay: DEFAULT_PAGE_DELAY,
            download_delay: DEFAULT_DOWNLOAD_DELAY,
            retry_policy: RetryPolicy::default(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

#[derive(Debug)]
struct ProviderPipeline {
    search: PaginatedSearch,
    fetcher: Arc<Fetcher>,
}

#[derive(Debug)]
struct ProviderRun {
    candidates: Vec<Candidate>,
    records: Vec<DownloadRecord>,
    failure: Option<String>,
}

/// Runs the search-fetch-rename pipeline.
#[derive(Debug)]
pub struct Retriever {
    layout: StorageLayout,
    engine: DownloadEngine,
    scholar: ProviderPipeline,
    pubmed: ProviderPipeline,
}

impl Retriever {
    /// Wires both provider pipelines from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Engine`] for an invalid concurrency and
    /// [`RetrievalError::Client`] when the HTTP client cannot be built.
    pub fn new(settings: RetrieverSettings) -> Result<Self, RetrievalError> {
        let engine = DownloadEngine::new(settings.concurrency)?;
        let client = HttpClient::with_timeouts(settings.timeouts)?;
        let raw = client.inner().clone();
        let page_limiter = Arc::new(RateLimiter::new(settings.page_delay));
        let download_limiter = Arc::new(RateLimiter::new(settings.download_delay));

        let scholar_transport = Arc::new(
            ScholarSearch::new(raw.clone(), settings.serpapi_key)
                .with_endpoint(settings.scholar_endpoint),
        );
        let pubmed_transport =
            Arc::new(PubMedSearch::new(raw.clone()).with_endpoint(settings.pubmed_search_url));

        let scholar = ProviderPipeline {
            search: PaginatedSearch::new(scholar_transport)
                .with_retry_policy(settings.retry_policy.clone())
                .with_rate_limiter(Arc::clone(&page_limiter)),
            fetcher: Arc::new(
                Fetcher::new(Provider::Scholar, client.clone(), Arc::new(DirectLocator::new()))
                    .with_retry_policy(settings.retry_policy.clone())
                    .with_rate_limiter(Arc::clone(&download_limiter)),
            ),
        };
        let pubmed = ProviderPipeline {
            search: PaginatedSearch::new(pubmed_transport)
                .with_retry_policy(settings.retry_policy.clone())
                .with_rate_limiter(page_limiter),
            fetcher: Arc::new(
                Fetcher::new(
                    Provider::PubMed,
                    client,
                    Arc::new(PmcLocator::with_base_url(raw, settings.pmc_base_url)),
                )
                .with_retry_policy(settings.retry_policy)
                .with_rate_limiter(download_limiter),
            ),
        };

        Ok(Self {
            layout: StorageLayout::new(settings.output_dir),
            engine,
            scholar,
            pubmed,
        })
    }

    /// Returns the storage layout.
    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn pipeline(&self, provider: Provider) -> &ProviderPipeline {
        match provider {
            Provider::Scholar => &self.scholar,
            Provider::PubMed => &self.pubmed,
        }
    }

    /// Runs a retrieval request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad request, or
    /// [`RetrievalError::AllSourcesFailed`] when no requested source could be
    /// searched at all.
    #[instrument(skip(self, request), fields(source = %request.source, max_results = request.max_results))]
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<RetrievalSummary, RetrievalError> {
        let terms = request.validate()?;
        let mut summary = RetrievalSummary::default();
        let mut attempted = 0usize;
        let mut failures = Vec::new();

        for (provider, budget) in request.source.split_budget(request.max_results) {
            if budget == 0 {
                continue;
            }
            attempted += 1;

            let run = self
                .run_provider(provider, request.source, &terms, budget)
                .await?;
            if let Some(reason) = run.failure {
                failures.push(format!("{provider}: {reason}"));
            }
            match provider {
                Provider::Scholar => summary.google_scholar = run.candidates,
                Provider::PubMed => summary.pubmed = run.candidates,
            }
            summary.stored_pdfs.extend(run.records);
        }

        if attempted > 0 && failures.len() == attempted {
            return Err(RetrievalError::AllSourcesFailed {
                details: failures.join("; "),
            });
        }

        info!(
            scholar = summary.google_scholar.len(),
            pubmed = summary.pubmed.len(),
            stored = summary.stored_count(),
            "retrieval complete"
        );
        Ok(summary)
    }

    #[instrument(skip(self, selection, terms), fields(provider = %provider))]
    async fn run_provider(
        &self,
        provider: Provider,
        selection: SourceSelection,
        terms: &[SearchTerm],
        budget: usize,
    ) -> Result<ProviderRun, RetrievalError> {
        let pipeline = self.pipeline(provider);
        let accumulator = Accumulator::with_cap(budget);

        let outcomes: Vec<TermOutcome> = join_all(terms.iter().enumerate().map(|(index, term)| {
            pipeline
                .search
                .search_into(term.raw(), index, &accumulator, budget)
        }))
        .await;

        let failure = if outcomes.iter().all(TermOutcome::failed_without_results) {
            outcomes.iter().find_map(|o| match &o.stop {
                StopReason::Failed(reason) => Some(reason.clone()),
                _ => None,
            })
        } else {
            None
        };
        if let Some(reason) = &failure {
            warn!(%reason, "provider search failed for every term");
        }

        let tagged = accumulator.drain_tagged(budget);
        let candidates: Vec<Candidate> = tagged.iter().map(|(c, _)| c.clone()).collect();
        info!(candidates = candidates.len(), budget, "search phase complete");

        let jobs = tagged
            .into_iter()
            .map(|(candidate, index)| {
                FetchJob::new(
                    candidate,
                    self.layout.directory(selection, provider, &terms[index]),
                )
            })
            .collect();
        let report = self
            .engine
            .fetch_all(Arc::clone(&pipeline.fetcher), jobs)
            .await?;
        let mut records = report.records;

        let mut renamed_dirs = HashSet::new();
        for term in terms {
            let dir = self.layout.directory(selection, provider, term);
            if !renamed_dirs.insert(dir.clone()) {
                continue;
            }
            let term = term.clone();
            let rename_dir = dir.clone();
            match tokio::task::spawn_blocking(move || rename_pdfs(&rename_dir, &term)).await {
                Ok(rename_report) => {
                    for record in records
                        .iter_mut()
                        .filter(|r| r.is_stored() && r.path.parent() == Some(dir.as_path()))
                    {
                        record.path = rename_report.final_path_for(&record.path);
                    }
                }
                Err(e) => warn!(dir = %dir.display(), error = %e, "rename task failed"),
            }
        }

        Ok(ProviderRun {
            candidates,
            records,
            failure,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_out_of_range_max_results() {
        for value in [0, 101] {
            let request = RetrievalRequest::new(vec!["x".into()], SourceSelection::PubMed, value);
            let error = request.validate().unwrap_err();
            assert!(matches!(error, RetrievalError::InvalidMaxResults { .. }));
            assert!(error.is_validation());
        }
    }

    #[test]
    fn test_validate_requires_a_term() {
        let request =
            RetrievalRequest::new(vec![" ".into(), String::new()], SourceSelection::Both, 5);
        assert!(matches!(
            request.validate(),
            Err(RetrievalError::NoSearchTerms)
        ));
    }

    #[test]
    fn test_validate_trims_terms() {
        let request = RetrievalRequest::new(
            vec!["  heart  ".into(), String::new(), "lung".into()],
            SourceSelection::Scholar,
            1,
        );
        let terms = request.validate().unwrap();
        assert_eq!(
            terms.iter().map(SearchTerm::raw).collect::<Vec<_>>(),
            vec!["heart", "lung"]
        );
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: RetrievalRequest = serde_json::from_str(
            r#"{"terms": ["cancer"], "source": "both", "max_results": 10}"#,
        )
        .unwrap();
        assert_eq!(request.source, SourceSelection::Both);
        assert_eq!(request.max_results, 10);
    }

    #[test]
    fn test_summary_serializes_expected_keys() {
        let summary = RetrievalSummary {
            google_scholar: vec![Candidate::new("https://a/x.pdf")],
            pubmed: vec![Candidate::new("PMC1")],
            stored_pdfs: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["google_scholar"][0], "https://a/x.pdf");
        assert_eq!(json["pubmed"][0], "PMC1");
        assert!(json["stored_pdfs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_retriever_rejects_bad_concurrency() {
        let settings = RetrieverSettings {
            concurrency: 0,
            ..RetrieverSettings::default()
        };
        assert!(matches!(
            Retriever::new(settings),
            Err(RetrievalError::Engine(EngineError::InvalidConcurrency { value: 0 }))
        ));
    }
}
