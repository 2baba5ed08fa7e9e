//! PubMed Central HTML search transport.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use tracing::debug;
use url::Url;

use super::extract::{ResultPage, parse_pmc_page};
use super::paginate::PAGE_STRIDE;
use super::{SearchError, SearchTransport};
use crate::source::Provider;
use crate::user_agent::BROWSER_USER_AGENT;

/// Production PMC search endpoint.
pub const DEFAULT_PUBMED_SEARCH_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/";

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Scrapes the PMC search results page.
#[derive(Debug, Clone)]
pub struct PubMedSearch {
    client: Client,
    endpoint: String,
}

impl PubMedSearch {
    /// Creates a transport against the production endpoint.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DEFAULT_PUBMED_SEARCH_URL.to_string(),
        }
    }

    /// Points the transport at another endpoint (mock servers in tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Builds `<endpoint>?term=<words joined by +>&page=<n>`; pages count from 1.
    fn page_url(&self, query: &str, offset: usize) -> Result<String, SearchError> {
        let term = query
            .split_whitespace()
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        let page = offset / PAGE_STRIDE + 1;
        let url = format!("{}?term={term}&page={page}", self.endpoint);
        Url::parse(&url).map_err(|_| SearchError::InvalidUrl {
            url: self.endpoint.clone(),
        })?;
        Ok(url)
    }
}

#[async_trait]
impl SearchTransport for PubMedSearch {
    fn provider(&self) -> Provider {
        Provider::PubMed
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_page(&self, query: &str, offset: usize) -> Result<String, SearchError> {
        let url = self.page_url(query, offset)?;
        debug!(url = %url, "requesting pubmed page");

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(|e| SearchError::transport(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(SearchError::http_status(url, status.as_u16(), retry_after));
        }

        response
            .text()
            .await
            .map_err(|e| SearchError::transport(url, e))
    }

    fn parse_page(&self, body: &str) -> ResultPage {
        parse_pmc_page(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_joins_words_with_plus() {
        let search = PubMedSearch::new(Client::new());
        assert_eq!(
            search.page_url("heart  disease", 0).unwrap(),
            "https://www.ncbi.nlm.nih.gov/pmc/?term=heart+disease&page=1"
        );
    }

    #[test]
    fn test_page_number_follows_offset() {
        let search = PubMedSearch::new(Client::new()).with_endpoint("http://localhost/pmc/");
        assert!(search.page_url("x", 20).unwrap().ends_with("&page=3"));
    }

    #[test]
    fn test_reserved_characters_encoded() {
        let search = PubMedSearch::new(Client::new());
        let url = search.page_url("a&b", 0).unwrap();
        assert!(url.contains("term=a%26b&"), "got {url}");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let search = PubMedSearch::new(Client::new()).with_endpoint("not a url");
        assert!(matches!(
            search.page_url("x", 0),
            Err(SearchError::InvalidUrl { .. })
        ));
    }
}
