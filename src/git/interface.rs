//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the local repository. It
//! reads; it never writes. Publishing happens entirely through the remote
//! object store.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::BareRepo`]: Repository has no working directory
//! - [`GitError::NotWorkTreeRoot`]: Path is below a working tree root
//! - [`GitError::IndexUnreadable`]: The index could not be loaded
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for path in git.tracked_paths()? {
//!     println!("{}", path);
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// The path is inside a repository but is not its working tree root.
    #[error("not the root of a working tree: {path} (repository root is {root})")]
    NotWorkTreeRoot {
        /// The path that was given
        path: PathBuf,
        /// The working tree root of the repository containing it
        root: PathBuf,
    },

    /// The index could not be read.
    #[error("cannot read index: {message}")]
    IndexUnreadable {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// Git repository interface.
///
/// Wraps a `git2::Repository`. All local repository reads go through here.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Open the repository whose working tree root is exactly `path`.
    ///
    /// Unlike [`Git::open`], a subdirectory of a working tree is refused:
    /// index paths are relative to the root, so resolving them anywhere
    /// else would read the wrong files.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    /// - [`GitError::NotWorkTreeRoot`] if `path` is below the root
    pub fn open_work_tree(path: &Path) -> Result<Self, GitError> {
        let git = Self::open(path)?;
        let root = git.work_dir()?.to_path_buf();

        let same = match (path.canonicalize(), root.canonicalize()) {
            (Ok(given), Ok(found)) => given == found,
            _ => false,
        };
        if !same {
            return Err(GitError::NotWorkTreeRoot {
                path: path.to_path_buf(),
                root,
            });
        }

        Ok(git)
    }

    /// Get direct access to the .git directory path.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Get the working directory root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// List every path recorded in the index, in index order.
    ///
    /// A path with unresolved conflicts appears once per stage in the index
    /// but only once here. Paths are `/`-separated and relative to the
    /// working directory root. Whether each path still exists on disk is
    /// not checked.
    ///
    /// # Errors
    ///
    /// - [`GitError::IndexUnreadable`] if the index cannot be loaded
    pub fn tracked_paths(&self) -> Result<Vec<String>, GitError> {
        let index = self.repo.index().map_err(|e| GitError::IndexUnreadable {
            message: e.message().to_string(),
        })?;

        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(index.len());
        for entry in index.iter() {
            let path = String::from_utf8_lossy(&entry.path).into_owned();
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the default remote name (usually "origin").
    ///
    /// Returns the first remote found, or `None` if no remotes exist.
    pub fn default_remote(&self) -> Result<Option<String>, GitError> {
        let remotes = self.repo.remotes()?;

        // Prefer "origin" if it exists
        if remotes.iter().flatten().any(|name| name == "origin") {
            return Ok(Some("origin".to_string()));
        }

        Ok(remotes.iter().flatten().next().map(String::from))
    }

    /// URL of the default remote, if any.
    pub fn default_remote_url(&self) -> Result<Option<String>, GitError> {
        match self.default_remote()? {
            Some(name) => self.remote_url(&name),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, git2::Repository) {
        let dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn stage(repo: &git2::Repository, rel: &str, content: &[u8]) {
        let workdir = repo.workdir().unwrap();
        let path = workdir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(rel)).unwrap();
        index.write().unwrap();
    }

    mod open {
        use super::*;

        #[test]
        fn not_a_repo() {
            let dir = TempDir::new().unwrap();
            let result = Git::open(dir.path());
            assert!(matches!(result, Err(GitError::NotARepo { .. })));
        }

        #[test]
        fn bare_repo_rejected() {
            let dir = TempDir::new().unwrap();
            git2::Repository::init_bare(dir.path()).unwrap();
            assert!(matches!(Git::open(dir.path()), Err(GitError::BareRepo)));
        }

        #[test]
        fn discovers_from_subdirectory() {
            let (dir, _repo) = init_repo();
            let sub = dir.path().join("nested/deeper");
            std::fs::create_dir_all(&sub).unwrap();

            let git = Git::open(&sub).unwrap();
            assert_eq!(
                git.work_dir().unwrap().canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
            assert!(git.git_dir().ends_with(".git/") || git.git_dir().ends_with(".git"));
        }

        #[test]
        fn work_tree_root_accepted() {
            let (dir, _repo) = init_repo();
            let git = Git::open_work_tree(dir.path()).unwrap();
            assert_eq!(
                git.work_dir().unwrap().canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
        }

        #[test]
        fn work_tree_subdirectory_refused() {
            let (dir, _repo) = init_repo();
            let sub = dir.path().join("site");
            std::fs::create_dir_all(&sub).unwrap();

            let err = Git::open_work_tree(&sub).unwrap_err();
            assert!(matches!(err, GitError::NotWorkTreeRoot { .. }));
        }

        #[test]
        fn work_tree_missing_path_is_not_a_repo() {
            let dir = TempDir::new().unwrap();
            let err = Git::open_work_tree(&dir.path().join("nope")).unwrap_err();
            assert!(matches!(err, GitError::NotARepo { .. }));
        }
    }

    mod tracked_paths {
        use super::*;

        #[test]
        fn empty_index() {
            let (dir, _repo) = init_repo();
            let git = Git::open(dir.path()).unwrap();
            assert!(git.tracked_paths().unwrap().is_empty());
        }

        #[test]
        fn lists_staged_files_with_forward_slashes() {
            let (dir, repo) = init_repo();
            stage(&repo, "README.md", b"# hi\n");
            stage(&repo, "src/lib.rs", b"\n");

            let git = Git::open(dir.path()).unwrap();
            let paths = git.tracked_paths().unwrap();
            assert_eq!(paths, vec!["README.md".to_string(), "src/lib.rs".to_string()]);
        }

        #[test]
        fn untracked_files_not_listed() {
            let (dir, repo) = init_repo();
            stage(&repo, "tracked.txt", b"a");
            std::fs::write(dir.path().join("untracked.txt"), b"b").unwrap();

            let git = Git::open(dir.path()).unwrap();
            assert_eq!(git.tracked_paths().unwrap(), vec!["tracked.txt".to_string()]);
        }

        #[test]
        fn deleted_but_indexed_file_still_listed() {
            let (dir, repo) = init_repo();
            stage(&repo, "gone.txt", b"a");
            std::fs::remove_file(dir.path().join("gone.txt")).unwrap();

            let git = Git::open(dir.path()).unwrap();
            assert_eq!(git.tracked_paths().unwrap(), vec!["gone.txt".to_string()]);
        }
    }

    mod remotes {
        use super::*;

        #[test]
        fn no_remotes() {
            let (dir, _repo) = init_repo();
            let git = Git::open(dir.path()).unwrap();
            assert_eq!(git.default_remote().unwrap(), None);
            assert_eq!(git.default_remote_url().unwrap(), None);
            assert_eq!(git.remote_url("origin").unwrap(), None);
        }

        #[test]
        fn prefers_origin() {
            let (dir, repo) = init_repo();
            repo.remote("alpha", "https://github.com/a/alpha.git").unwrap();
            repo.remote("origin", "git@github.com:o/r.git").unwrap();

            let git = Git::open(dir.path()).unwrap();
            assert_eq!(git.default_remote().unwrap(), Some("origin".to_string()));
            assert_eq!(
                git.default_remote_url().unwrap(),
                Some("git@github.com:o/r.git".to_string())
            );
        }

        #[test]
        fn falls_back_to_first_remote() {
            let (dir, repo) = init_repo();
            repo.remote("upstream", "https://github.com/u/r.git").unwrap();

            let git = Git::open(dir.path()).unwrap();
            assert_eq!(git.default_remote().unwrap(), Some("upstream".to_string()));
        }
    }
}
