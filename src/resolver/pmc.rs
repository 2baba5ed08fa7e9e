//! PMC locator: resolves a `PMC<digits>` identifier to its PDF URL.
//!
//! The article landing page is fetched and scanned with three heuristics,
//! first match wins:
//!
//! 1. a `div.format-menu` containing an anchor whose href ends in `.pdf`
//! 2. an anchor whose text mentions `PDF` and whose href ends in `.pdf` or
//!    contains `/pdf/`
//! 3. any anchor whose href ends in `.pdf` or contains `/pdf/`
//!
//! Hits resolve to the canonical `<base>/articles/<id>/pdf/` URL, except an
//! absolute href found by the third heuristic, which is used verbatim.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use scraper::{Html, Selector};
use tracing::debug;

use super::{LocatedPdf, PdfLocator, ResolveError};
use crate::search::Candidate;
use crate::search::extract::{compile_static_regex, compile_static_selector};
use crate::user_agent::BROWSER_USER_AGENT;

/// Production PMC base URL.
pub const DEFAULT_PMC_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc";

static PMCID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"^PMC\d+$"));
static FORMAT_MENU: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div.format-menu"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));

/// Locates PDFs on PMC article landing pages.
#[derive(Debug, Clone)]
pub struct PmcLocator {
    client: Client,
    base_url: String,
}

impl PmcLocator {
    /// Creates a locator against the production PMC host.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_PMC_BASE_URL)
    }

    /// Creates a locator with a custom base URL for tests.
    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn article_url(&self, pmcid: &str) -> String {
        format!("{}/articles/{pmcid}/", self.base_url)
    }
}

#[async_trait]
impl PdfLocator for PmcLocator {
    fn name(&self) -> &'static str {
        "pmc"
    }

    fn landing_page(&self, candidate: &Candidate) -> Option<String> {
        PMCID_RE
            .is_match(candidate.as_str())
            .then(|| self.article_url(candidate.as_str()))
    }

    #[tracing::instrument(skip(self), fields(locator = "pmc"))]
    async fn locate(&self, candidate: &Candidate) -> Result<LocatedPdf, ResolveError> {
        let pmcid = candidate.as_str();
        let Some(landing) = self.landing_page(candidate) else {
            return Err(ResolveError::invalid_candidate(
                pmcid,
                "expected a PMC identifier such as PMC1234567",
            ));
        };

        let response = self
            .client
            .get(&landing)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| ResolveError::transport(&landing, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(ResolveError::HttpStatus {
                url: landing,
                status: status.as_u16(),
                retry_after,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| ResolveError::transport(&landing, e))?;

        let Some(pdf_url) = find_pdf_link(&html, pmcid, &self.base_url) else {
            return Err(ResolveError::NoPdfLink {
                candidate: pmcid.to_string(),
            });
        };
        debug!(pdf_url = %pdf_url, "resolved PMC PDF");

        Ok(LocatedPdf::new(pdf_url)
            .with_referer(landing)
            .with_user_agent(BROWSER_USER_AGENT))
    }
}

/// Applies the landing-page heuristics to `html`.
#[must_use]
pub fn find_pdf_link(html: &str, pmcid: &str, base_url: &str) -> Option<String> {
    let canonical = || {
        format!(
            "{}/articles/{pmcid}/pdf/",
            base_url.trim_end_matches('/')
        )
    };
    let document = Html::parse_document(html);

    let in_format_menu = document.select(&FORMAT_MENU).any(|menu| {
        menu.select(&ANCHOR)
            .filter_map(|a| a.value().attr("href"))
            .any(|href| href.ends_with(".pdf"))
    });
    if in_format_menu {
        debug!("PDF link found in format menu");
        return Some(canonical());
    }

    let labelled_button = document.select(&ANCHOR).any(|a| {
        let text: String = a.text().collect();
        let href = a.value().attr("href").unwrap_or_default();
        text.contains("PDF") && is_pdf_href(href)
    });
    if labelled_button {
        debug!("PDF link found in labelled anchor");
        return Some(canonical());
    }

    let href = document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| !href.is_empty() && is_pdf_href(href))?;
    if href.starts_with("http") {
        Some(href.to_string())
    } else {
        Some(canonical())
    }
}

fn is_pdf_href(href: &str) -> bool {
    href.ends_with(".pdf") || href.contains("/pdf/")
}
