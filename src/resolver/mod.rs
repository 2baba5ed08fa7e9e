//! Resolution of candidates into downloadable PDF URLs.
//!
//! - [`PdfLocator`] - Async trait each provider's locator implements
//! - [`DirectLocator`] - Scholar candidates are already PDF URLs
//! - [`PmcLocator`] - PubMed candidates are resolved via the PMC landing page
//!
//! The trait is the seam where other strategies (for example a
//! browser-automation fallback) plug in.

mod direct;
mod error;
mod pmc;

pub use direct::DirectLocator;
pub use error::ResolveError;
pub use pmc::{DEFAULT_PMC_BASE_URL, PmcLocator, find_pdf_link};

use async_trait::async_trait;

use crate::search::Candidate;

/// A resolved PDF target plus the headers the host expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedPdf {
    /// URL of the PDF.
    pub url: String,
    /// Referer to send with the download.
    pub referer: Option<String>,
    /// User-Agent override for the download.
    pub user_agent: Option<&'static str>,
}

impl LocatedPdf {
    /// Creates a target with no extra headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
            user_agent: None,
        }
    }

    /// Sets the Referer header.
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the User-Agent override.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &'static str) -> Self {
        self.user_agent = Some(user_agent);
        self
    }
}

/// Turns a candidate into a downloadable PDF URL.
#[async_trait]
pub trait PdfLocator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// The page `locate` will request first, if any; used for rate limiting.
    fn landing_page(&self, _candidate: &Candidate) -> Option<String> {
        None
    }

    /// Resolves `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the candidate is malformed, the landing
    /// page cannot be fetched, or no PDF link exists.
    async fn locate(&self, candidate: &Candidate) -> Result<LocatedPdf, ResolveError>;
}
