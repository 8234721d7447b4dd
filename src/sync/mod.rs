//! sync
//!
//! The snapshot publish pipeline.
//!
//! # Architecture
//!
//! A run flows strictly forward through four stages:
//!
//! 1. **Authenticate** - acquire one bearer token and confirm the identity
//!    it belongs to
//! 2. **Enumerate** - list tracked files and drop missing paths and
//!    directories ([`enumerate`])
//! 3. **Upload** - store every file as a blob with bounded concurrency
//!    ([`upload`])
//! 4. **Compose** - tree, commit, and branch pointer ([`compose`])
//!
//! # Invariants
//!
//! - No remote object is created before authentication succeeds
//! - Every upload has finished (or failed) before the tree is created
//! - With fail-fast (the default) a single upload failure means no tree,
//!   commit, or ref call is made
//! - A commit is only pointed at once it exists remotely
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::sync::{SyncOptions, Synchronizer};
//!
//! let report = Synchronizer::new(&auth, &enumerator, SyncOptions::default())
//!     .run(|token| Arc::new(GitHubObjectStore::new(token, "o", "r")))
//!     .await?;
//! println!("{}", report.commit.commit_hash);
//! ```

pub mod compose;
pub mod enumerate;
pub mod upload;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::{AuthError, Authenticator, Token};
use crate::core::config::{Config, DEFAULT_CONCURRENCY, DEFAULT_MESSAGE};
use crate::core::types::{BlobRef, BranchName, CommitRef, Oid, TreeRef};
use crate::forge::{ForgeError, ObjectStore};
use crate::git::GitError;

pub use compose::{ComposeError, ComposeStage, Parent, RefUpdate};
pub use enumerate::{filter_existing, EnumerationSkip, FileEnumerator, IndexEnumerator, SkipReason};
pub use upload::{BlobUploader, UploadError, UploadOutcome};

/// Milestones of a run, for logging.
#[derive(Debug)]
pub enum SyncEvent<'a> {
    /// The token belongs to this login.
    Authenticated { login: &'a str },
    /// A tracked path was excluded.
    Skipped(&'a EnumerationSkip),
    /// Enumeration and filtering finished.
    Enumerated { tracked: usize, publishable: usize },
    /// All uploads have finished.
    UploadsFinished { uploaded: usize, failed: usize },
    /// The branch tip was read.
    ParentResolved(&'a Parent),
    TreeCreated(&'a TreeRef),
    CommitCreated(&'a CommitRef),
}

/// Observer for upload progress and run milestones.
///
/// Not part of the correctness contract; every method defaults to a no-op.
pub trait ProgressSink: Send + Sync {
    /// One blob was stored.
    fn blob_uploaded(&self, _blob: &BlobRef) {}

    /// One file failed to upload.
    fn upload_failed(&self, _err: &UploadError) {}

    /// A run milestone was reached.
    fn event(&self, _event: SyncEvent<'_>) {}
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No token could be acquired.
    #[error("auth stage failed")]
    Auth(#[from] AuthError),

    /// The token was rejected when confirming identity.
    #[error("auth stage failed: cannot confirm identity")]
    Identity(#[source] ForgeError),

    /// The index could not be read.
    #[error("enumerate stage failed")]
    Enumerate(#[from] GitError),

    /// No file survived filtering (or every upload failed in best-effort
    /// mode).
    #[error("nothing to publish: no tracked file could be stored")]
    EmptySnapshot,

    /// Uploads failed in fail-fast mode.
    #[error("upload stage failed: {failed} of {attempted} files failed")]
    UploadFailed {
        failed: usize,
        attempted: usize,
        /// The first failure in enumeration order.
        #[source]
        first: UploadError,
    },

    /// A tree, commit, or ref call was rejected.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Branch to publish to.
    pub branch: BranchName,
    /// Commit message.
    pub message: String,
    /// Maximum uploads in flight.
    pub concurrency: usize,
    /// Publish the successful subset when some uploads fail.
    pub best_effort: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            branch: BranchName::default(),
            message: DEFAULT_MESSAGE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            best_effort: false,
        }
    }
}

impl SyncOptions {
    /// Options from merged configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            branch: config.branch(),
            message: config.message().to_string(),
            concurrency: config.concurrency(),
            best_effort: config.best_effort(),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct SyncReport {
    /// Login the token belongs to.
    pub user: String,
    /// The published commit.
    pub commit: CommitRef,
    /// How the branch was moved.
    pub update: RefUpdate,
    /// Blobs in the published tree, in tree order.
    pub blobs: Vec<BlobRef>,
    /// Tracked paths left out before upload.
    pub skipped: Vec<EnumerationSkip>,
    /// Upload failures tolerated in best-effort mode.
    pub failures: Vec<UploadError>,
    /// Browsable repository URL.
    pub url: String,
}

impl SyncReport {
    /// Remote objects created: one blob per distinct content, plus one
    /// tree and one commit.
    ///
    /// Files with identical bytes share a blob, so this can be smaller than
    /// the number of tree entries.
    pub fn objects_created(&self) -> usize {
        let distinct: HashSet<&Oid> = self.blobs.iter().map(|b| &b.content_hash).collect();
        distinct.len() + 2
    }
}

/// Drives one publish run.
pub struct Synchronizer<'a> {
    authenticator: &'a dyn Authenticator,
    enumerator: &'a dyn FileEnumerator,
    options: SyncOptions,
    progress: Arc<dyn ProgressSink>,
}

impl<'a> Synchronizer<'a> {
    /// Create a synchronizer with no progress reporting.
    pub fn new(
        authenticator: &'a dyn Authenticator,
        enumerator: &'a dyn FileEnumerator,
        options: SyncOptions,
    ) -> Self {
        Self {
            authenticator,
            enumerator,
            options,
            progress: Arc::new(NoProgress),
        }
    }

    /// Report progress and milestones to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run the pipeline once.
    ///
    /// `connect` turns the acquired token into the object store every
    /// later stage talks to.
    ///
    /// # Errors
    ///
    /// The first [`SyncError`] encountered; nothing is retried.
    pub async fn run<F>(&self, connect: F) -> Result<SyncReport, SyncError>
    where
        F: FnOnce(Token) -> Arc<dyn ObjectStore>,
    {
        let token = self.authenticator.acquire_token().await?;
        let store = connect(token);
        let user = store
            .authenticated_user()
            .await
            .map_err(SyncError::Identity)?;
        self.progress
            .event(SyncEvent::Authenticated { login: &user });

        let records = self.enumerator.list_tracked_files()?;
        let tracked = records.len();
        let (files, skipped) = filter_existing(records);
        for skip in &skipped {
            self.progress.event(SyncEvent::Skipped(skip));
        }
        self.progress.event(SyncEvent::Enumerated {
            tracked,
            publishable: files.len(),
        });
        if files.is_empty() {
            return Err(SyncError::EmptySnapshot);
        }

        let uploader = BlobUploader::new(
            Arc::clone(&store),
            self.options.concurrency,
            Arc::clone(&self.progress),
        );
        let outcome = uploader.upload_all(files).await;
        self.progress.event(SyncEvent::UploadsFinished {
            uploaded: outcome.blobs.len(),
            failed: outcome.failures.len(),
        });

        let attempted = outcome.attempted();
        let UploadOutcome { blobs, failures } = outcome;
        if !self.options.best_effort {
            let failed = failures.len();
            if let Some(first) = failures.into_iter().next() {
                return Err(SyncError::UploadFailed {
                    failed,
                    attempted,
                    first,
                });
            }
            return self.compose(store.as_ref(), user, blobs, skipped, Vec::new()).await;
        }

        if blobs.is_empty() {
            return Err(SyncError::EmptySnapshot);
        }
        self.compose(store.as_ref(), user, blobs, skipped, failures)
            .await
    }

    async fn compose(
        &self,
        store: &dyn ObjectStore,
        user: String,
        blobs: Vec<BlobRef>,
        skipped: Vec<EnumerationSkip>,
        failures: Vec<UploadError>,
    ) -> Result<SyncReport, SyncError> {
        let branch = &self.options.branch;

        let resolved = compose::Idle.resolve_parent(store, branch).await?;
        self.progress
            .event(SyncEvent::ParentResolved(&resolved.parent));

        let tree = resolved.create_tree(store, &blobs).await?;
        self.progress.event(SyncEvent::TreeCreated(&tree.tree));

        let commit = tree.create_commit(store, &self.options.message).await?;
        self.progress
            .event(SyncEvent::CommitCreated(&commit.commit));

        let done = commit.move_ref(store, branch).await?;

        Ok(SyncReport {
            user,
            commit: done.commit,
            update: done.update,
            blobs,
            skipped,
            failures,
            url: store.web_url(),
        })
    }
}
