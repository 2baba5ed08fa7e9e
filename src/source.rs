//! Search providers and the source selection offered to callers.
//!
//! A [`Provider`] is one concrete search backend. A [`SourceSelection`] is what a
//! caller asks for: a single provider, or both of them sharing one result budget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A concrete search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Google Scholar, queried through SerpAPI.
    Scholar,
    /// PubMed Central full-text search.
    PubMed,
}

impl Provider {
    /// Returns the directory name used for this provider's downloads.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Scholar => "Scholar",
            Self::PubMed => "PubMed",
        }
    }

    /// Returns the key used for this provider in response payloads.
    #[must_use]
    pub fn response_key(self) -> &'static str {
        match self {
            Self::Scholar => "google_scholar",
            Self::PubMed => "pubmed",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scholar => write!(f, "Google Scholar"),
            Self::PubMed => write!(f, "PubMed"),
        }
    }
}

/// The source(s) a retrieval request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelection {
    /// Google Scholar only.
    Scholar,
    /// PubMed only.
    #[serde(rename = "pubmed")]
    PubMed,
    /// Both providers, splitting the result budget.
    Both,
}

impl SourceSelection {
    /// Returns the providers this selection covers, in listing order.
    #[must_use]
    pub fn providers(self) -> &'static [Provider] {
        match self {
            Self::Scholar => &[Provider::Scholar],
            Self::PubMed => &[Provider::PubMed],
            Self::Both => &[Provider::Scholar, Provider::PubMed],
        }
    }

    /// Splits a result budget across the covered providers.
    ///
    /// For [`SourceSelection::Both`] the first-listed provider (Scholar) receives
    /// `ceil(n / 2)` and PubMed receives `floor(n / 2)`.
    ///
    /// ```
    /// use retriever_core::{Provider, SourceSelection};
    ///
    /// assert_eq!(
    ///     SourceSelection::Both.split_budget(11),
    ///     vec![(Provider::Scholar, 6), (Provider::PubMed, 5)]
    /// );
    /// ```
    #[must_use]
    pub fn split_budget(self, max_results: usize) -> Vec<(Provider, usize)> {
        match self {
            Self::Scholar => vec![(Provider::Scholar, max_results)],
            Self::PubMed => vec![(Provider::PubMed, max_results)],
            Self::Both => {
                let half = max_results / 2;
                vec![
                    (Provider::Scholar, half + max_results % 2),
                    (Provider::PubMed, half),
                ]
            }
        }
    }

    /// Returns whether this selection stores files under the combined `Both` tree.
    #[must_use]
    pub fn is_combined(self) -> bool {
        matches!(self, Self::Both)
    }
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scholar => write!(f, "Google Scholar"),
            Self::PubMed => write!(f, "PubMed"),
            Self::Both => write!(f, "BOTH"),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = String;

    /// Accepts the short names (`scholar`, `pubmed`, `both`) and the display
    /// labels (`Google Scholar`, `PubMed`, `BOTH`), case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "scholar" | "google scholar" => Ok(Self::Scholar),
            "pubmed" => Ok(Self::PubMed),
            "both" => Ok(Self::Both),
            _ => Err(format!(
                "invalid search source '{value}': expected scholar, pubmed, or both"
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_budget_even() {
        assert_eq!(
            SourceSelection::Both.split_budget(10),
            vec![(Provider::Scholar, 5), (Provider::PubMed, 5)]
        );
    }

    #[test]
    fn test_split_budget_odd_remainder_goes_to_scholar() {
        assert_eq!(
            SourceSelection::Both.split_budget(11),
            vec![(Provider::Scholar, 6), (Provider::PubMed, 5)]
        );
        assert_eq!(
            SourceSelection::Both.split_budget(1),
            vec![(Provider::Scholar, 1), (Provider::PubMed, 0)]
        );
    }

    #[test]
    fn test_split_budget_single_provider_gets_everything() {
        assert_eq!(
            SourceSelection::PubMed.split_budget(7),
            vec![(Provider::PubMed, 7)]
        );
        assert_eq!(
            SourceSelection::Scholar.split_budget(7),
            vec![(Provider::Scholar, 7)]
        );
    }

    #[test]
    fn test_from_str_accepts_labels_and_short_names() {
        assert_eq!(
            "Google Scholar".parse::<SourceSelection>().unwrap(),
            SourceSelection::Scholar
        );
        assert_eq!(
            "google_scholar".parse::<SourceSelection>().unwrap(),
            SourceSelection::Scholar
        );
        assert_eq!(
            "PubMed".parse::<SourceSelection>().unwrap(),
            SourceSelection::PubMed
        );
        assert_eq!(
            "BOTH".parse::<SourceSelection>().unwrap(),
            SourceSelection::Both
        );
        assert!("arxiv".parse::<SourceSelection>().is_err());
    }

    #[test]
    fn test_serde_uses_short_names() {
        let json = serde_json::to_string(&SourceSelection::PubMed).unwrap();
        assert_eq!(json, "\"pubmed\"");
        let parsed: SourceSelection = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(parsed, SourceSelection::Both);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::Scholar.dir_name(), "Scholar");
        assert_eq!(Provider::PubMed.response_key(), "pubmed");
        assert_eq!(Provider::Scholar.to_string(), "Google Scholar");
    }
}
