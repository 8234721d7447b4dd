//! forge::traits
//!
//! Object store trait for the hosting service's low-level git data API.
//!
//! # Design
//!
//! The `ObjectStore` trait is async because every operation is one HTTP
//! round trip. Each method maps to exactly one remote request, and no
//! method retries. Callers decide what a failure means for the run.
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::forge::{ObjectStore, CreateCommitRequest};
//!
//! async fn publish_one(store: &dyn ObjectStore, branch: &BranchName) -> Result<(), ForgeError> {
//!     let blob = store.create_blob(b"hello\n").await?;
//!     let tree = store.create_tree(&[BlobRef::regular("hello.txt", blob)]).await?;
//!     let commit = store.create_commit(CreateCommitRequest {
//!         message: "Publish".to_string(),
//!         tree: tree.tree_hash,
//!         parent: None,
//!     }).await?;
//!     store.create_ref(branch, &commit.commit_hash).await
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BlobRef, BranchName, CommitRef, Oid, TreeRef};

/// Errors from object store operations.
///
/// These map to the failure modes of the hosting service's REST API.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A create-ref found the ref already present, or an update-ref found it
    /// missing.
    #[error("reference conflict: {0}")]
    RefConflict(String),
}

impl ForgeError {
    /// HTTP status behind this error, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ForgeError::AuthFailed(_) => Some(401),
            ForgeError::NotFound(_) => Some(404),
            ForgeError::RateLimited => Some(429),
            ForgeError::RefConflict(_) => Some(422),
            ForgeError::ApiError { status, .. } => Some(*status),
            ForgeError::NetworkError(_) => None,
        }
    }
}

/// Request to create a commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitRequest {
    /// Commit message
    pub message: String,
    /// Tree the commit snapshots
    pub tree: Oid,
    /// Parent commit; `None` for the first commit on a branch
    pub parent: Option<Oid>,
}

impl CreateCommitRequest {
    /// Parent list as sent on the wire (`[]` or `[parent]`).
    pub fn parents(&self) -> Vec<Oid> {
        self.parent.iter().cloned().collect()
    }
}

/// The object store trait for publishing snapshots.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; blob uploads run as concurrent
/// tasks sharing one store.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthFailed`: token expired or under-scoped
/// - `NotFound`: repository (or ref) doesn't exist
/// - `RateLimited`: the run fails; nothing is retried here
/// - `RefConflict`: the branch changed state between read and write
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Browsable URL of the target repository.
    fn web_url(&self) -> String;

    /// Login of the account the token belongs to.
    async fn authenticated_user(&self) -> Result<String, ForgeError>;

    /// Store `content` as a blob and return its content hash.
    ///
    /// Identical content always yields the same hash.
    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError>;

    /// Create a tree from `entries`, in the given order.
    async fn create_tree(&self, entries: &[BlobRef]) -> Result<TreeRef, ForgeError>;

    /// Create a commit object.
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<CommitRef, ForgeError>;

    /// Read the tip of `branch`.
    ///
    /// # Returns
    ///
    /// `Some(oid)` if the branch exists, `None` if it does not (including a
    /// repository with no commits at all).
    async fn get_ref(&self, branch: &BranchName) -> Result<Option<Oid>, ForgeError>;

    /// Move an existing branch to `sha`.
    ///
    /// # Errors
    ///
    /// - `RefConflict` if the branch does not exist
    async fn update_ref(&self, branch: &BranchName, sha: &Oid, force: bool)
        -> Result<(), ForgeError>;

    /// Create `branch` pointing at `sha`.
    ///
    /// # Errors
    ///
    /// - `RefConflict` if the branch already exists
    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError>;
}
