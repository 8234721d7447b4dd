//! gitsnap - publish a repository snapshot to GitHub
//!
//! gitsnap uploads every file tracked in a local repository's index to a
//! GitHub repository through the git data API, assembles them into one
//! tree and one commit, and moves the target branch to that commit. It
//! never runs `git push`: the remote history gains exactly one commit per
//! run, whose parent is whatever the branch pointed at before.
//!
//! # Architecture
//!
//! The pipeline runs strictly forward: auth, enumerate, upload, compose.
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to handlers)
//! - [`sync`] - The publish pipeline: enumeration, blob uploads, tree/commit/ref composition
//! - [`auth`] - Token acquisition from the connector service
//! - [`forge`] - Remote object store abstraction (GitHub git data API, in-memory mock)
//! - [`git`] - Local repository access (index, remotes)
//! - [`core`] - Domain types, configuration, publish lock
//! - [`seo`] - `robots.txt` and `sitemap.xml` documents and their HTTP server
//! - [`ui`] - Terminal output
//!
//! # Invariants
//!
//! 1. No tree, commit or ref request is made unless every upload succeeded
//!    (or best-effort mode was chosen)
//! 2. The published tree contains exactly the blobs that were uploaded
//! 3. The new commit's only parent is the branch tip read in the same run
//! 4. The token is never logged, printed or persisted

pub mod auth;
pub mod cli;
pub mod core;
pub mod forge;
pub mod git;
pub mod seo;
pub mod sync;
pub mod ui;
