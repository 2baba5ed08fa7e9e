//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so failed download
//! records explain themselves without extra context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while downloading a PDF.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// File system error while writing or cleaning up the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server answered with something other than a PDF or binary stream.
    #[error("invalid content type '{content_type}' downloading {url}")]
    InvalidContentType {
        /// The URL that was downloaded.
        url: String,
        /// The declared Content-Type (empty when missing).
        content_type: String,
    },

    /// The download completed but is too small to be a real PDF.
    #[error("downloaded file too small ({bytes} bytes, minimum {minimum}) from {url}")]
    TooSmall {
        /// The URL that was downloaded.
        url: String,
        /// Bytes received.
        bytes: u64,
        /// Minimum accepted size.
        minimum: u64,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid content type error.
    pub fn invalid_content_type(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates an undersized download error.
    pub fn too_small(url: impl Into<String>, bytes: u64, minimum: u64) -> Self {
        Self::TooSmall {
            url: url.into(),
            bytes,
            minimum,
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
