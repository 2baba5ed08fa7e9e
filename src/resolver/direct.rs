//! Direct locator - passthrough for candidates that already are PDF URLs.
//!
//! Scholar candidates are the `link` of a PDF resource, so they need no
//! resolution beyond checking that they parse as HTTP(S) URLs.

use async_trait::async_trait;
use url::Url;

use super::{LocatedPdf, PdfLocator, ResolveError};
use crate::search::Candidate;

/// A locator that passes URLs through unchanged.
#[derive(Debug, Default)]
pub struct DirectLocator;

impl DirectLocator {
    /// Creates a new `DirectLocator`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfLocator for DirectLocator {
    fn name(&self) -> &'static str {
        "direct"
    }

    #[tracing::instrument(skip(self), fields(locator = "direct"))]
    async fn locate(&self, candidate: &Candidate) -> Result<LocatedPdf, ResolveError> {
        let url = Url::parse(candidate.as_str())
            .map_err(|e| ResolveError::invalid_candidate(candidate.as_str(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResolveError::invalid_candidate(
                candidate.as_str(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(LocatedPdf::new(candidate.as_str()))
    }
}
