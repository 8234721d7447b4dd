//! git
//!
//! Single interface for local Git reads.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to the local repository. No other
//! module imports `git2`. We use the `git2` crate exclusively (no shelling
//! out to the git CLI).
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Listing the paths recorded in the index
//! - Remote URL lookup
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let paths = git.tracked_paths()?;
//! let origin = git.default_remote_url()?;
//! ```

mod interface;

pub use interface::{Git, GitError};
