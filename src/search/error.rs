//! Error types for provider search requests.

use thiserror::Error;

use crate::download::{FailureType, classify_http_status, classify_network_error};

/// Errors raised while fetching one search results page.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level failure (DNS, connection refused, reset).
    #[error("network error searching {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded its timeout.
    #[error("timeout searching {url}")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The provider answered with a non-success status.
    #[error("HTTP {status} searching {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// The configured endpoint is not a valid URL.
    #[error("invalid search endpoint: {url}")]
    InvalidUrl {
        /// The offending endpoint.
        url: String,
    },

    /// No SerpAPI key was configured.
    #[error("SerpAPI key missing: set SERP_API_KEY or serpapi_key in the config file")]
    MissingApiKey,
}

impl SearchError {
    /// Builds the right variant for a reqwest transport error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Classifies this error for the retry policy.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } => classify_network_error(source),
            Self::Timeout { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::InvalidUrl { .. } | Self::MissingApiKey => FailureType::Permanent,
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
    fn test_failure_type_by_variant() {
        assert_eq!(
            SearchError::http_status("u", 503, None).failure_type(),
            FailureType::Transient
        );
        assert_eq!(
            SearchError::http_status("u", 429, Some("2".into())).failure_type(),
            FailureType::RateLimited
        );
        assert_eq!(
            SearchError::http_status("u", 401, None).failure_type(),
            FailureType::Permanent
        );
        assert_eq!(
            SearchError::MissingApiKey.failure_type(),
            FailureType::Permanent
        );
        assert_eq!(
            SearchError::Timeout { url: "u".into() }.failure_type(),
            FailureType::Transient
        );
    }

    #[test]
    fn test_retry_after_exposed() {
        let error = SearchError::http_status("u", 429, Some("5".into()));
        assert_eq!(error.retry_after(), Some("5"));
        assert!(SearchError::MissingApiKey.retry_after().is_none());
    }
}
