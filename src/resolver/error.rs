//! Errors raised while locating a candidate's PDF.

use thiserror::Error;

use crate::download::{FailureType, classify_http_status, classify_network_error};

/// Failure to turn a candidate into a downloadable PDF URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The landing page could not be fetched.
    #[error("network error fetching landing page {url}: {source}")]
    Network {
        /// Landing page URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The landing page request timed out.
    #[error("timeout fetching landing page {url}")]
    Timeout {
        /// Landing page URL.
        url: String,
    },

    /// The landing page answered with a non-success status.
    #[error("HTTP {status} fetching landing page {url}")]
    HttpStatus {
        /// Landing page URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// The landing page exposes no PDF link.
    #[error("no PDF link found for {candidate}")]
    NoPdfLink {
        /// The candidate being resolved.
        candidate: String,
    },

    /// The candidate is not something this locator understands.
    #[error("invalid candidate '{candidate}': {reason}")]
    InvalidCandidate {
        /// The rejected candidate.
        candidate: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ResolveError {
    /// Builds the right variant for a reqwest transport error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an invalid candidate error.
    pub fn invalid_candidate(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCandidate {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }

    /// Classifies this error for the retry policy.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } => classify_network_error(source),
            Self::Timeout { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::NoPdfLink { .. } | Self::InvalidCandidate { .. } => FailureType::Permanent,
        }
    }

    /// Returns the Retry-After header carried by an HTTP status error.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pdf_link_is_permanent() {
        let error = ResolveError::NoPdfLink {
            candidate: "PMC1".into(),
        };
        assert_eq!(error.failure_type(), FailureType::Permanent);
        assert!(error.to_string().contains("PMC1"));
    }

    #[test]
    fn test_landing_page_5xx_is_transient() {
        let error = ResolveError::HttpStatus {
            url: "https://x".into(),
            status: 502,
            retry_after: None,
        };
        assert_eq!(error.failure_type(), FailureType::Transient);
    }
}
