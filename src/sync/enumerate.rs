//! sync::enumerate
//!
//! Tracked-file enumeration and local existence filtering.
//!
//! # Design
//!
//! The enumerator reports what the index says; it does not look at the
//! filesystem. [`filter_existing`] then drops every record whose absolute
//! path is gone or is a directory (deleted-but-still-indexed files,
//! submodule checkouts). Dropped records become [`EnumerationSkip`]s, which
//! are logged and never fail the run.

use std::path::PathBuf;

use crate::core::types::FileRecord;
use crate::git::{Git, GitError};

/// Source of the files to publish.
///
/// Called once per run, before any upload.
pub trait FileEnumerator {
    /// Every tracked file, in a stable order, as of the call.
    fn list_tracked_files(&self) -> Result<Vec<FileRecord>, GitError>;
}

/// Enumerates the paths in a repository's index.
///
/// Index paths are relative to the repository's own working tree, so that
/// is the only directory they are resolved against.
#[derive(Debug)]
pub struct IndexEnumerator<'a> {
    git: &'a Git,
    workdir: PathBuf,
}

impl<'a> IndexEnumerator<'a> {
    /// Enumerate `git`'s index.
    ///
    /// # Errors
    ///
    /// - [`GitError::BareRepo`] if the repository has no working tree
    pub fn new(git: &'a Git) -> Result<Self, GitError> {
        Ok(Self {
            git,
            workdir: git.work_dir()?.to_path_buf(),
        })
    }
}

impl FileEnumerator for IndexEnumerator<'_> {
    fn list_tracked_files(&self) -> Result<Vec<FileRecord>, GitError> {
        Ok(self
            .git
            .tracked_paths()?
            .into_iter()
            .map(|rel| FileRecord::new(&self.workdir, rel))
            .collect())
    }
}

/// A fixed list of records.
impl FileEnumerator for Vec<FileRecord> {
    fn list_tracked_files(&self) -> Result<Vec<FileRecord>, GitError> {
        Ok(self.clone())
    }
}

/// Why a record was left out of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing exists at the path (or it is a dangling symlink).
    Missing,
    /// The path is a directory.
    Directory,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "does not exist"),
            SkipReason::Directory => write!(f, "is a directory"),
        }
    }
}

/// A tracked path excluded before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationSkip {
    pub path: String,
    pub reason: SkipReason,
}

impl std::fmt::Display for EnumerationSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipping {}: {}", self.path, self.reason)
    }
}

/// Split records into those present on disk as files and those skipped.
///
/// Order of the kept records is preserved.
pub fn filter_existing(records: Vec<FileRecord>) -> (Vec<FileRecord>, Vec<EnumerationSkip>) {
    let mut kept = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        // metadata follows symlinks, so a link to a file is kept
        match std::fs::metadata(&record.absolute_path) {
            Ok(meta) if meta.is_dir() => skipped.push(EnumerationSkip {
                path: record.relative_path,
                reason: SkipReason::Directory,
            }),
            Ok(_) => kept.push(record),
            Err(_) => skipped.push(EnumerationSkip {
                path: record.relative_path,
                reason: SkipReason::Missing,
            }),
        }
    }

    (kept, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn keeps_files_drops_directories_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let records = vec![
            FileRecord::new(dir.path(), "a.txt"),
            FileRecord::new(dir.path(), "vendor"),
            FileRecord::new(dir.path(), "gone.txt"),
            FileRecord::new(dir.path(), "b.txt"),
        ];

        let (kept, skipped) = filter_existing(records);

        let kept: Vec<_> = kept.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(kept, vec!["a.txt", "b.txt"]);
        assert_eq!(
            skipped,
            vec![
                EnumerationSkip {
                    path: "vendor".into(),
                    reason: SkipReason::Directory
                },
                EnumerationSkip {
                    path: "gone.txt".into(),
                    reason: SkipReason::Missing
                },
            ]
        );
    }

    #[test]
    fn skip_display() {
        let skip = EnumerationSkip {
            path: "vendor/lib".into(),
            reason: SkipReason::Directory,
        };
        assert_eq!(skip.to_string(), "skipping vendor/lib: is a directory");
    }

    #[test]
    fn vec_enumerator_returns_records() {
        let records = vec![FileRecord::new(Path::new("/w"), "x")];
        assert_eq!(records.list_tracked_files().unwrap(), records);
    }

    #[test]
    fn index_enumerator_resolves_under_workdir() {
        let dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html>").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("index.html")).unwrap();
        index.write().unwrap();

        std::fs::create_dir(dir.path().join("site")).unwrap();

        // Opened from a subdirectory, paths still resolve from the root
        let git = Git::open(&dir.path().join("site")).unwrap();
        let enumerator = IndexEnumerator::new(&git).unwrap();
        let records = enumerator.list_tracked_files().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relative_path, "index.html");
        assert_eq!(
            records[0].absolute_path.canonicalize().unwrap(),
            dir.path().join("index.html").canonicalize().unwrap()
        );
    }
}
