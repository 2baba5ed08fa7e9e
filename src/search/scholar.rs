//! Google Scholar search through the SerpAPI JSON endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use tracing::debug;
use url::Url;

use super::extract::{ResultPage, parse_scholar_page};
use super::{SearchError, SearchTransport};
use crate::source::Provider;

/// Production SerpAPI endpoint.
pub const DEFAULT_SCHOLAR_ENDPOINT: &str = "https://serpapi.com/search";

/// SerpAPI `google_scholar` engine transport.
#[derive(Clone)]
pub struct ScholarSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ScholarSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholarSearch")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ScholarSearch {
    /// Creates a transport against the production endpoint.
    #[must_use]
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: DEFAULT_SCHOLAR_ENDPOINT.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Points the transport at another endpoint (mock servers in tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn page_url(&self, query: &str, offset: usize, api_key: &str) -> Result<Url, SearchError> {
        let mut url = Url::parse(&self.endpoint).map_err(|_| SearchError::InvalidUrl {
            url: self.endpoint.clone(),
        })?;
        url.query_pairs_mut()
            .append_pair("engine", "google_scholar")
            .append_pair("q", query)
            .append_pair("start", &offset.to_string())
            .append_pair("api_key", api_key);
        Ok(url)
    }
}

#[async_trait]
impl SearchTransport for ScholarSearch {
    fn provider(&self) -> Provider {
        Provider::Scholar
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_page(&self, query: &str, offset: usize) -> Result<String, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingApiKey)?;
        let url = self.page_url(query, offset, api_key)?;
        // Error messages carry this form so the key never reaches the logs.
        let display_url = format!("{}?q={query}&start={offset}", self.endpoint);
        debug!(url = %display_url, "requesting scholar page");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SearchError::transport(&display_url, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(SearchError::http_status(
                display_url,
                status.as_u16(),
                retry_after,
            ));
        }

        response
            .text()
            .await
            .map_err(|e| SearchError::transport(display_url, e.without_url()))
    }

    fn parse_page(&self, body: &str) -> ResultPage {
        parse_scholar_page(body)
    }
}
