//! HTTP client wrapper for streaming PDFs to disk.
//!
//! [`HttpClient::download_pdf`] performs one download attempt: it sends the
//! request, checks the status and declared content type, streams the body
//! into a `.part` file next to the destination, enforces the minimum size,
//! and only then moves the file into place. Retrying is the caller's job.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, RETRY_AFTER, USER_AGENT};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{MIN_PDF_BYTES, PARTIAL_SUFFIX};
use super::error::DownloadError;
use crate::http_client::{HttpTimeouts, build_http_client};

/// Per-request options for a PDF download.
#[derive(Debug, Clone, Default)]
pub struct PdfRequest<'a> {
    /// Referer header to send (PMC expects the article landing page).
    pub referer: Option<&'a str>,
    /// User-Agent override.
    pub user_agent: Option<&'a str>,
}

/// HTTP client for downloading PDFs with streaming support.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    min_bytes: u64,
}

impl HttpClient {
    /// Creates a client with the default 30 second timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(HttpTimeouts::default())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] when the HTTP client cannot be built.
    pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self, DownloadError> {
        let client =
            build_http_client(timeouts).map_err(|e| DownloadError::network("<client>", e))?;
        Ok(Self::from_client(client))
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            min_bytes: MIN_PDF_BYTES,
        }
    }

    /// Overrides the minimum accepted download size.
    #[must_use]
    pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    /// Returns the minimum accepted download size.
    #[must_use]
    pub fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Downloads `url` to exactly `destination`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout) or returns a non-2xx status
    /// - The declared content type is neither PDF nor octet-stream
    /// - Writing to disk fails
    /// - The body is smaller than the minimum PDF size (the file is removed)
    #[instrument(skip(self, request), fields(url = %url, path = %destination.display()))]
    pub async fn download_pdf(
        &self,
        url: &str,
        destination: &Path,
        request: &PdfRequest<'_>,
    ) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let mut builder = self
            .client
            .get(url)
            .header(ACCEPT, "application/pdf,application/octet-stream;q=0.9,*/*;q=0.5");
        if let Some(referer) = request.referer {
            builder = builder.header(REFERER, referer);
        }
        if let Some(user_agent) = request.user_agent {
            builder = builder.header(USER_AGENT, user_agent);
        }

        let response = builder.send().await.map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(DownloadError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_pdf_content_type(&content_type) {
            return Err(DownloadError::invalid_content_type(url, content_type));
        }

        let partial_path = partial_path_for(destination);
        let bytes_written = match stream_to_file(response, url, &partial_path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(path = %partial_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&partial_path).await;
                return Err(error);
            }
        };

        if bytes_written < self.min_bytes {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(DownloadError::too_small(url, bytes_written, self.min_bytes));
        }

        tokio::fs::rename(&partial_path, destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        info!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }
}

/// Returns whether a (lowercased) Content-Type header denotes a PDF or binary body.
#[must_use]
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.contains("pdf") || content_type.contains("octet-stream")
}

fn transport_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

fn partial_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let file = File::create(file_path)
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| transport_error(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
