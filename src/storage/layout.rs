//! Directory layout for stored PDFs.
//!
//! ```text
//! <root>/Scholar/<term>/            single-source Scholar runs
//! <root>/PubMed/<term>/             single-source PubMed runs
//! <root>/Both/{Scholar,PubMed}/<term>/   combined runs
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::download::filename::replace_reserved_chars;
use crate::source::{Provider, SourceSelection};

/// Default storage root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "download";

/// Maximum characters in a sanitized term.
const MAX_TERM_CHARS: usize = 200;

/// Name used when a term sanitizes to nothing.
const FALLBACK_TERM: &str = "default";

/// A search term plus its filesystem-safe form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchTerm {
    raw: String,
    sanitized: String,
}

impl SearchTerm {
    /// Normalizes a raw term.
    ///
    /// ```
    /// use retriever_core::SearchTerm;
    ///
    /// assert_eq!(SearchTerm::new("covid/19: risk?").sanitized(), "covid_19_ risk_");
    /// assert_eq!(SearchTerm::new("   ").sanitized(), "default");
    /// ```
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let sanitized = sanitize_term(&raw);
        Self { raw, sanitized }
    }

    /// The term as typed, used for provider queries.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The term as a single path component.
    #[must_use]
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn sanitize_term(raw: &str) -> String {
    let replaced = replace_reserved_chars(raw);
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return FALLBACK_TERM.to_string();
    }

    let mut sanitized: String = trimmed.chars().take(MAX_TERM_CHARS).collect();
    if sanitized.chars().all(|c| c == '.') {
        sanitized = sanitized.replace('.', "_");
    }
    let sanitized = sanitized.trim_end().to_string();
    if sanitized.is_empty() {
        FALLBACK_TERM.to_string()
    } else {
        sanitized
    }
}

/// Maps (selection, provider, term) to directories under one root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl StorageLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory a provider's PDFs for `term` land in.
    #[must_use]
    pub fn directory(
        &self,
        selection: SourceSelection,
        provider: Provider,
        term: &SearchTerm,
    ) -> PathBuf {
        let mut dir = self.root.clone();
        if selection.is_combined() {
            dir.push("Both");
        }
        dir.push(provider.dir_name());
        dir.push(term.sanitized());
        dir
    }

    /// Returns every directory a selection uses for `term`.
    #[must_use]
    pub fn term_directories(
        &self,
        selection: SourceSelection,
        term: &SearchTerm,
    ) -> Vec<(Provider, PathBuf)> {
        selection
            .providers()
            .iter()
            .map(|&provider| (provider, self.directory(selection, provider, term)))
            .collect()
    }

    /// Lists stored PDFs, relative to the root, sorted.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a directory under the root cannot be read.
    pub fn list_stored_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "storage root does not exist");
            return Ok(files);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && is_pdf(&path) {
                    let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                    files.push(relative.to_path_buf());
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

pub(crate) fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
