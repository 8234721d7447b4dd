//! forge::mock
//!
//! In-memory object store for deterministic testing.
//!
//! # Design
//!
//! Objects are content addressed with SHA-256 over a git-style header
//! (`blob <len>\0<bytes>`), so identical content always maps to the same
//! id. Every call is recorded, and any operation can be configured to fail.
//!
//! # Example
//!
//! ```
//! use gitsnap::forge::mock::MockObjectStore;
//! use gitsnap::forge::ObjectStore;
//!
//! # tokio_test::block_on(async {
//! let store = MockObjectStore::new();
//!
//! let a = store.create_blob(b"same").await.unwrap();
//! let b = store.create_blob(b"same").await.unwrap();
//! assert_eq!(a, b);
//! assert_eq!(store.blob_count(), 1);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{CreateCommitRequest, ForgeError, ObjectStore};
use crate::core::types::{BlobRef, BranchName, CommitRef, Oid, TreeRef};

/// Login reported by [`ObjectStore::authenticated_user`].
pub const MOCK_USER: &str = "mock-user";

/// Mock object store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockObjectStore {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockStoreInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockStoreInner {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, Vec<BlobRef>>,
    commits: HashMap<Oid, CommitRef>,
    /// Branch name to tip.
    refs: HashMap<String, Oid>,
    /// Distinguishes otherwise identical commits.
    commit_seq: u64,
    /// Operations to fail (for testing error paths).
    fail_on: Vec<FailOn>,
    /// A ref write (or delete, for `None`) applied right after the next
    /// ref read.
    concurrent_write: Option<(BranchName, Option<Oid>)>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail authenticated_user with the given error.
    AuthenticatedUser(ForgeError),
    /// Fail every create_blob with the given error.
    CreateBlob(ForgeError),
    /// Fail create_blob only for this exact content.
    CreateBlobFor {
        content: Vec<u8>,
        error: ForgeError,
    },
    /// Fail create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail get_ref with the given error.
    GetRef(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
    /// Fail create_ref with the given error.
    CreateRef(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    AuthenticatedUser,
    CreateBlob {
        len: usize,
    },
    CreateTree {
        entries: Vec<BlobRef>,
    },
    CreateCommit {
        tree: Oid,
        parents: Vec<Oid>,
        message: String,
    },
    GetRef {
        branch: String,
    },
    UpdateRef {
        branch: String,
        sha: Oid,
        force: bool,
    },
    CreateRef {
        branch: String,
        sha: Oid,
    },
}

impl MockOperation {
    /// Whether this operation writes a tree, commit, or ref.
    pub fn is_compose_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
                | MockOperation::CreateRef { .. }
        )
    }
}

impl MockObjectStore {
    /// Create a new empty mock store (no branches, no objects).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner::default())),
        }
    }

    /// Create a mock store where `branch` already points at `tip`.
    pub fn with_ref(self, branch: &BranchName, tip: Oid) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.refs.insert(branch.as_str().to_string(), tip);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// May be called repeatedly to fail several operations.
    ///
    /// # Example
    ///
    /// ```
    /// use gitsnap::forge::mock::{MockObjectStore, FailOn};
    /// use gitsnap::forge::ForgeError;
    ///
    /// let store = MockObjectStore::new()
    ///     .fail_on(FailOn::CreateTree(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on.push(fail_on);
        }
        self
    }

    /// Simulate another writer: right after the next `get_ref` returns,
    /// `branch` is set to `tip`.
    pub fn with_concurrent_write(self, branch: &BranchName, tip: Oid) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.concurrent_write = Some((branch.clone(), Some(tip)));
        }
        self
    }

    /// Simulate another writer: right after the next `get_ref` returns,
    /// `branch` is deleted.
    pub fn with_concurrent_delete(self, branch: &BranchName) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.concurrent_write = Some((branch.clone(), None));
        }
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.blobs.len()
    }

    /// Content of a stored blob.
    pub fn blob(&self, oid: &Oid) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.blobs.get(oid).cloned()
    }

    /// Entries of a stored tree.
    pub fn tree(&self, oid: &Oid) -> Option<Vec<BlobRef>> {
        let inner = self.inner.lock().unwrap();
        inner.trees.get(oid).cloned()
    }

    /// Current tip of `branch`.
    pub fn ref_tip(&self, branch: &BranchName) -> Option<Oid> {
        let inner = self.inner.lock().unwrap();
        inner.refs.get(branch.as_str()).cloned()
    }

    /// The id this store assigns to `content`.
    pub fn hash_blob(content: &[u8]) -> Oid {
        let mut hasher = Sha256::new();
        hasher.update(format!("blob {}\0", content.len()).as_bytes());
        hasher.update(content);
        digest_oid(hasher)
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, matches: impl Fn(&FailOn) -> Option<&ForgeError>) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        match inner.fail_on.iter().find_map(matches) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn digest_oid(hasher: Sha256) -> Oid {
    // 64 hex characters always form a valid SHA-256 object id
    Oid::new(hex::encode(hasher.finalize())).unwrap()
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn web_url(&self) -> String {
        "https://github.com/mock/repo".to_string()
    }

    async fn authenticated_user(&self) -> Result<String, ForgeError> {
        self.record(MockOperation::AuthenticatedUser);
        self.check_fail(|f| match f {
            FailOn::AuthenticatedUser(e) => Some(e),
            _ => None,
        })?;
        Ok(MOCK_USER.to_string())
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateBlob { len: content.len() });
        self.check_fail(|f| match f {
            FailOn::CreateBlob(e) => Some(e),
            FailOn::CreateBlobFor { content: c, error } if c.as_slice() == content => Some(error),
            _ => None,
        })?;

        let oid = Self::hash_blob(content);
        let mut inner = self.inner.lock().unwrap();
        inner.blobs.insert(oid.clone(), content.to_vec());
        Ok(oid)
    }

    async fn create_tree(&self, entries: &[BlobRef]) -> Result<TreeRef, ForgeError> {
        self.record(MockOperation::CreateTree {
            entries: entries.to_vec(),
        });
        self.check_fail(|f| match f {
            FailOn::CreateTree(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"tree\0");
        for entry in entries {
            if !inner.blobs.contains_key(&entry.content_hash) {
                return Err(ForgeError::ApiError {
                    status: 422,
                    message: format!("tree.sha {} is not a valid blob", entry.content_hash),
                });
            }
            hasher.update(entry.mode.as_str().as_bytes());
            hasher.update(b" ");
            hasher.update(entry.path.as_bytes());
            hasher.update(b"\0");
            hasher.update(entry.content_hash.as_str().as_bytes());
        }
        let tree_hash = digest_oid(hasher);
        inner.trees.insert(tree_hash.clone(), entries.to_vec());
        Ok(TreeRef { tree_hash })
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<CommitRef, ForgeError> {
        self.record(MockOperation::CreateCommit {
            tree: request.tree.clone(),
            parents: request.parents(),
            message: request.message.clone(),
        });
        self.check_fail(|f| match f {
            FailOn::CreateCommit(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(&request.tree) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: "Tree SHA does not exist".into(),
            });
        }

        inner.commit_seq += 1;
        let mut hasher = Sha256::new();
        hasher.update(format!("commit {}\0", inner.commit_seq).as_bytes());
        hasher.update(request.tree.as_str().as_bytes());
        for parent in request.parents() {
            hasher.update(parent.as_str().as_bytes());
        }
        hasher.update(request.message.as_bytes());

        let commit = CommitRef {
            commit_hash: digest_oid(hasher),
            tree_hash: request.tree,
            parent_hash: request.parent,
            message: request.message,
        };
        inner
            .commits
            .insert(commit.commit_hash.clone(), commit.clone());
        Ok(commit)
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<Option<Oid>, ForgeError> {
        self.record(MockOperation::GetRef {
            branch: branch.as_str().to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::GetRef(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let tip = inner.refs.get(branch.as_str()).cloned();
        match inner.concurrent_write.take() {
            Some((other, Some(oid))) => {
                inner.refs.insert(other.as_str().to_string(), oid);
            }
            Some((other, None)) => {
                inner.refs.remove(other.as_str());
            }
            None => {}
        }
        Ok(tip)
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        sha: &Oid,
        force: bool,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.as_str().to_string(),
            sha: sha.clone(),
            force,
        });
        self.check_fail(|f| match f {
            FailOn::UpdateRef(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let current = inner.refs.get(branch.as_str()).cloned();
        let Some(current) = current else {
            return Err(ForgeError::RefConflict("Reference does not exist".into()));
        };

        let descends = inner
            .commits
            .get(sha)
            .and_then(|c| c.parent_hash.as_ref())
            .is_some_and(|p| *p == current);
        if !force && !descends {
            return Err(ForgeError::ApiError {
                status: 422,
                message: "Update is not a fast forward".into(),
            });
        }

        inner.refs.insert(branch.as_str().to_string(), sha.clone());
        Ok(())
    }

    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError> {
        self.record(MockOperation::CreateRef {
            branch: branch.as_str().to_string(),
            sha: sha.clone(),
        });
        self.check_fail(|f| match f {
            FailOn::CreateRef(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        if inner.refs.contains_key(branch.as_str()) {
            return Err(ForgeError::RefConflict("Reference already exists".into()));
        }
        inner.refs.insert(branch.as_str().to_string(), sha.clone());
        Ok(())
    }
}
