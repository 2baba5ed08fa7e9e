//! Pure link extraction from provider responses.
//!
//! Neither extractor ever fails: malformed or empty input yields an empty
//! list. Output preserves document order and contains no duplicates.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::Candidate;

static RESULT_ENTRY: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("div.rslt"));
static LINK: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));
static PMCID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"PMC(\d+)"));

/// Compiles a regex that is known-valid at compile time.
///
/// # Panics
///
/// Panics on an invalid pattern; only call with string literals.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Compiles a CSS selector that is known-valid at compile time.
///
/// # Panics
///
/// Panics on an invalid selector; only call with string literals.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e:?}"))
}

/// One parsed provider page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    /// Result entries on the page, with or without a usable link.
    pub entries: usize,
    /// Unique candidates in document order.
    pub candidates: Vec<Candidate>,
}

impl ResultPage {
    /// True when the provider returned no result entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Parses a SerpAPI Google Scholar JSON response.
///
/// Every element of `organic_results` (or `results`) counts as an entry.
/// Candidates are the `link` of each resource whose `file_format` is `"PDF"`.
#[must_use]
pub fn parse_scholar_page(body: &str) -> ResultPage {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        debug!("scholar response is not valid JSON");
        return ResultPage::default();
    };

    let results = json
        .get("organic_results")
        .or_else(|| json.get("results"))
        .and_then(Value::as_array);
    let Some(results) = results else {
        return ResultPage::default();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for result in results {
        let Some(resources) = result.get("resources").and_then(Value::as_array) else {
            continue;
        };
        for resource in resources {
            let is_pdf = resource.get("file_format").and_then(Value::as_str) == Some("PDF");
            let link = resource
                .get("link")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|l| !l.is_empty());
            if let (true, Some(link)) = (is_pdf, link)
                && seen.insert(link.to_string())
            {
                links.push(Candidate::new(link));
            }
        }
    }
    ResultPage {
        entries: results.len(),
        candidates: links,
    }
}

/// Extracts PDF resource links from a SerpAPI Google Scholar JSON response.
#[must_use]
pub fn extract_scholar_pdf_links(body: &str) -> Vec<Candidate> {
    parse_scholar_page(body).candidates
}

/// Parses a PMC search results page.
///
/// Every `div.rslt` counts as an entry. Only anchors inside those entries
/// whose `href` contains `/articles/PMC` contribute `PMC<digits>` candidates.
#[must_use]
pub fn parse_pmc_page(html: &str) -> ResultPage {
    if html.trim().is_empty() {
        return ResultPage::default();
    }

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut entries = 0;

    for entry in document.select(&RESULT_ENTRY) {
        entries += 1;
        for anchor in entry.select(&LINK) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.contains("/articles/PMC") {
                continue;
            }
            if let Some(caps) = PMCID_RE.captures(href) {
                let id = format!("PMC{}", &caps[1]);
                if seen.insert(id.clone()) {
                    ids.push(Candidate::new(id));
                }
            }
        }
    }

    debug!(entries, count = ids.len(), "extracted PMC identifiers");
    ResultPage {
        entries,
        candidates: ids,
    }
}

/// Extracts `PMC<digits>` identifiers from a PMC search results page.
#[must_use]
pub fn extract_pmcids(html: &str) -> Vec<Candidate> {
    parse_pmc_page(html).candidates
}
