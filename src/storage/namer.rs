//! Sequential renaming of a term directory's PDFs.
//!
//! Files are ordered by creation time (modification time where the platform
//! has no birth time, then by name) and renamed `{term}1.pdf`, `{term}2.pdf`,
//! and so on. Rename passes over one directory are serialized within the
//! process; concurrent processes working on the same directory may still race.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::SystemTime;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::layout::{SearchTerm, is_pdf};

static DIRECTORY_LOCKS: LazyLock<DashMap<PathBuf, Arc<Mutex<()>>>> = LazyLock::new(DashMap::new);

/// Outcome of one rename pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    /// `(old, new)` paths of files that were renamed.
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Files left alone because their target name was taken.
    pub skipped: Vec<PathBuf>,
    /// Files that already carried their target name.
    pub unchanged: Vec<PathBuf>,
}

impl RenameReport {
    /// Returns where a file that was in the directory before the pass lives now.
    #[must_use]
    pub fn final_path_for(&self, original: &Path) -> PathBuf {
        self.renamed
            .iter()
            .find(|(from, _)| from == original)
            .map_or_else(|| original.to_path_buf(), |(_, to)| to.clone())
    }
}

/// Renames every PDF in `dir` to `{term}{n}.pdf`, numbered from 1.
///
/// A missing directory is logged and yields an empty report. Entries that
/// cannot be inspected and rename errors are logged; those files keep their
/// names and the pass continues.
#[instrument(skip(term), fields(dir = %dir.display(), term = %term.sanitized()))]
pub fn rename_pdfs(dir: &Path, term: &SearchTerm) -> RenameReport {
    if !dir.is_dir() {
        warn!("directory does not exist, nothing to rename");
        return RenameReport::default();
    }

    let key = lock_key(dir);
    let lock = DIRECTORY_LOCKS
        .entry(key.clone())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let report = {
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        rename_locked(dir, term)
    };
    drop(lock);
    DIRECTORY_LOCKS.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
    report
}

/// Lock map key for `dir`: `download/x` and `./download/x` share one lock.
fn lock_key(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

fn rename_locked(dir: &Path, term: &SearchTerm) -> RenameReport {
    let mut report = RenameReport::default();
    let files = match ordered_pdfs(dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "cannot list directory");
            return report;
        }
    };

    for (index, path) in files.into_iter().enumerate() {
        let target = dir.join(format!("{}{}.pdf", term.sanitized(), index + 1));
        if path == target {
            report.unchanged.push(path);
            continue;
        }
        if target.exists() {
            warn!(
                from = %path.display(),
                to = %target.display(),
                "target name already exists, keeping original name"
            );
            report.skipped.push(path);
            continue;
        }
        match std::fs::rename(&path, &target) {
            Ok(()) => {
                debug!(from = %path.display(), to = %target.display(), "renamed");
                report.renamed.push((path, target));
            }
            Err(e) => {
                warn!(from = %path.display(), error = %e, "rename failed");
                report.skipped.push(path);
            }
        }
    }

    info!(
        renamed = report.renamed.len(),
        skipped = report.skipped.len(),
        unchanged = report.unchanged.len(),
        "rename pass complete"
    );
    report
}

fn ordered_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(error = %e, "unreadable directory entry, skipping");
                continue;
            }
        };
        if !is_pdf(&path) {
            continue;
        }
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot inspect file, skipping");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let stamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push((stamp, path));
    }
    entries.sort();
    Ok(entries.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn write_spaced(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_renames_in_creation_order_without_gaps() {
        let temp = TempDir::new().unwrap();
        write_spaced(temp.path(), &["zeta.pdf", "alpha.pdf", "mid.pdf"]);

        let report = rename_pdfs(temp.path(), &SearchTerm::new("cancer"));

        assert_eq!(report.renamed.len(), 3);
        assert_eq!(
            names(temp.path()),
            vec!["cancer1.pdf", "cancer2.pdf", "cancer3.pdf"]
        );
        assert_eq!(
            report.final_path_for(&temp.path().join("zeta.pdf")),
            temp.path().join("cancer1.pdf")
        );
        assert_eq!(
            report.final_path_for(&temp.path().join("mid.pdf")),
            temp.path().join("cancer3.pdf")
        );
    }

    #[test]
    fn test_ignores_non_pdf_files() {
        let temp = TempDir::new().unwrap();
        write_spaced(temp.path(), &["a.pdf", "notes.txt", "b.pdf.part"]);
        rename_pdfs(temp.path(), &SearchTerm::new("t"));
        assert_eq!(names(temp.path()), vec!["b.pdf.part", "notes.txt", "t1.pdf"]);
    }

    #[test]
    fn test_existing_target_skipped() {
        let temp = TempDir::new().unwrap();
        write_spaced(temp.path(), &["first.pdf", "t1.pdf"]);

        let report = rename_pdfs(temp.path(), &SearchTerm::new("t"));

        // first.pdf wants t1.pdf (taken); t1.pdf wants t2.pdf.
        assert_eq!(report.skipped, vec![temp.path().join("first.pdf")]);
        assert_eq!(names(temp.path()), vec!["first.pdf", "t2.pdf"]);
    }

    #[test]
    fn test_second_pass_is_stable() {
        let temp = TempDir::new().unwrap();
        write_spaced(temp.path(), &["x.pdf", "y.pdf"]);
        let term = SearchTerm::new("t");
        rename_pdfs(temp.path(), &term);
        let report = rename_pdfs(temp.path(), &term);
        assert!(report.renamed.is_empty());
        assert_eq!(report.unchanged.len(), 2);
        assert_eq!(names(temp.path()), vec!["t1.pdf", "t2.pdf"]);
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let temp = TempDir::new().unwrap();
        let report = rename_pdfs(&temp.path().join("absent"), &SearchTerm::new("t"));
        assert_eq!(report, RenameReport::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_uninspectable_entry_does_not_abort_pass() {
        let temp = TempDir::new().unwrap();
        write_spaced(temp.path(), &["a.pdf"]);
        std::os::unix::fs::symlink(temp.path().join("gone.pdf"), temp.path().join("broken.pdf"))
            .unwrap();
        write_spaced(temp.path(), &["b.pdf"]);

        let report = rename_pdfs(temp.path(), &SearchTerm::new("t"));

        assert_eq!(report.renamed.len(), 2);
        assert_eq!(names(temp.path()), vec!["broken.pdf", "t1.pdf", "t2.pdf"]);
    }

    #[test]
    fn test_equivalent_paths_share_one_lock_entry() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("term");
        std::fs::create_dir(&dir).unwrap();
        let dotted = temp.path().join(".").join("term");
        assert_eq!(lock_key(&dir), lock_key(&dotted));

        write_spaced(&dir, &["a.pdf"]);
        rename_pdfs(&dotted, &SearchTerm::new("t"));
        assert!(!DIRECTORY_LOCKS.contains_key(&lock_key(&dir)));
        assert_eq!(names(&dir), vec!["t1.pdf"]);
    }
}
