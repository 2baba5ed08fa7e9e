//! The provider-specific identifier a search produces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A URL (Scholar) or `PMC<digits>` identifier (PubMed).
///
/// Equality is plain string equality and drives deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    /// Wraps a raw identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the candidate, returning the identifier text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Candidate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Candidate {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_serializes_as_plain_string() {
        let candidate = Candidate::new("PMC42");
        assert_eq!(serde_json::to_string(&candidate).unwrap(), "\"PMC42\"");
        let back: Candidate = serde_json::from_str("\"PMC42\"").unwrap();
        assert_eq!(back, candidate);
    }
}
