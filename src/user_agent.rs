//! Shared User-Agent strings for search, resolver, and download requests.

/// Browser User-Agent sent to PubMed Central.
///
/// PMC answers non-browser agents with a bot-check page instead of search
/// results, so PMC search, landing page, and PDF requests use this string.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Default User-Agent identifying the tool (used for SerpAPI and direct links).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("article-retriever/{version} (academic-research-tool)")
}
