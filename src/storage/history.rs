//! Recent-search persistence.
//!
//! [`SearchHistory`] is the collaborator interface; [`JsonFileHistory`]
//! stores the newest entries first in a small JSON array, replacing any
//! earlier entry with the same terms.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::source::SourceSelection;

/// Entries kept by [`JsonFileHistory`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One recorded search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Terms as entered.
    pub terms: Vec<String>,
    /// Selected source(s).
    pub source: SourceSelection,
    /// Requested result budget.
    pub max_results: usize,
    /// Unix timestamp (seconds) of the search.
    pub searched_at: u64,
    /// Number of PDFs stored by the run.
    pub stored_pdfs: usize,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(
        terms: Vec<String>,
        source: SourceSelection,
        max_results: usize,
        stored_pdfs: usize,
    ) -> Self {
        let searched_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            terms,
            source,
            max_results,
            searched_at,
            stored_pdfs,
        }
    }
}

/// Errors reading or writing the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// File system failure.
    #[error("history IO error at {path}: {source}")]
    Io {
        /// History file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The history file is not valid JSON.
    #[error("history file {path} is corrupt: {source}")]
    Json {
        /// History file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for recent searches.
pub trait SearchHistory {
    /// Returns entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] when the store cannot be read.
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Records an entry.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] when the store cannot be written.
    fn save(&self, entry: HistoryEntry) -> Result<(), HistoryError>;
}

/// JSON-file backed history.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
    capacity: usize,
}

impl JsonFileHistory {
    /// Creates a history stored at `path`, keeping the last ten searches.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Overrides how many entries are kept.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SearchHistory for JsonFileHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.load()?;
        entries.retain(|existing| existing.terms != entry.terms);
        entries.insert(0, entry);
        entries.truncate(self.capacity);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(&entries).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })?;
        let mut temp = self.path.as_os_str().to_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        std::fs::write(&temp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "history saved");
        Ok(())
    }
}
