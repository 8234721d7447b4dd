//! sync::compose
//!
//! Tree, commit, and ref composition.
//!
//! # State Machine
//!
//! ```text
//! Idle ─resolve_parent─▶ ParentResolved{HasParent|NoParent}
//!      ─create_tree────▶ TreeCreated
//!      ─create_commit──▶ CommitCreated
//!      ─move_ref───────▶ RefUpdated{Forced|Created}
//! ```
//!
//! Each state is its own type and each transition consumes the previous
//! state, so a step cannot run out of order or twice. Every transition is
//! one remote call (the ref move may be two, see below) and none is
//! retried. A failure ends composition with a [`ComposeError`] naming the
//! stage.
//!
//! # Ref Movement
//!
//! Whether the branch existed is decided once, by the parent read. An
//! existing branch is force-updated; an absent one is created. If the
//! remote answers with a ref conflict (the branch was created or deleted by
//! someone else after the read), the other call is issued once.

use thiserror::Error;

use crate::core::types::{BlobRef, BranchName, CommitRef, Oid, TreeRef};
use crate::forge::{CreateCommitRequest, ForgeError, ObjectStore};

/// The step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeStage {
    ResolveParent,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl std::fmt::Display for ComposeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeStage::ResolveParent => write!(f, "resolve parent"),
            ComposeStage::CreateTree => write!(f, "create tree"),
            ComposeStage::CreateCommit => write!(f, "create commit"),
            ComposeStage::UpdateRef => write!(f, "update ref"),
        }
    }
}

/// A remote call during composition was rejected.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct ComposeError {
    pub stage: ComposeStage,
    #[source]
    pub source: ForgeError,
}

impl ComposeError {
    fn at(stage: ComposeStage) -> impl FnOnce(ForgeError) -> Self {
        move |source| ComposeError { stage, source }
    }
}

/// What the parent read found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The branch exists with this tip.
    HasParent(Oid),
    /// The branch does not exist; the commit will be a root commit.
    NoParent,
}

impl Parent {
    fn oid(&self) -> Option<&Oid> {
        match self {
            Parent::HasParent(oid) => Some(oid),
            Parent::NoParent => None,
        }
    }
}

/// How the branch pointer ended up at the new commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    /// An existing branch was force-moved.
    Forced,
    /// The branch was created.
    Created,
}

/// Nothing done yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

/// The branch tip has been read.
#[derive(Debug, Clone)]
pub struct ParentResolved {
    pub parent: Parent,
}

/// The snapshot tree exists remotely.
#[derive(Debug, Clone)]
pub struct TreeCreated {
    pub parent: Parent,
    pub tree: TreeRef,
}

/// The commit exists remotely.
#[derive(Debug, Clone)]
pub struct CommitCreated {
    pub parent: Parent,
    pub commit: CommitRef,
}

/// Terminal state: the branch points at the new commit.
#[derive(Debug, Clone)]
pub struct RefUpdated {
    pub commit: CommitRef,
    pub update: RefUpdate,
}

impl Idle {
    /// Read the current tip of `branch`.
    pub async fn resolve_parent(
        self,
        store: &dyn ObjectStore,
        branch: &BranchName,
    ) -> Result<ParentResolved, ComposeError> {
        let tip = store
            .get_ref(branch)
            .await
            .map_err(ComposeError::at(ComposeStage::ResolveParent))?;

        let parent = match tip {
            Some(oid) => Parent::HasParent(oid),
            None => Parent::NoParent,
        };
        Ok(ParentResolved { parent })
    }
}

impl ParentResolved {
    /// Create one tree holding every blob, in the given order.
    pub async fn create_tree(
        self,
        store: &dyn ObjectStore,
        blobs: &[BlobRef],
    ) -> Result<TreeCreated, ComposeError> {
        let tree = store
            .create_tree(blobs)
            .await
            .map_err(ComposeError::at(ComposeStage::CreateTree))?;

        Ok(TreeCreated {
            parent: self.parent,
            tree,
        })
    }
}

impl TreeCreated {
    /// Create a commit of the tree on top of the resolved parent.
    pub async fn create_commit(
        self,
        store: &dyn ObjectStore,
        message: &str,
    ) -> Result<CommitCreated, ComposeError> {
        let commit = store
            .create_commit(CreateCommitRequest {
                message: message.to_string(),
                tree: self.tree.tree_hash,
                parent: self.parent.oid().cloned(),
            })
            .await
            .map_err(ComposeError::at(ComposeStage::CreateCommit))?;

        Ok(CommitCreated {
            parent: self.parent,
            commit,
        })
    }
}

impl CommitCreated {
    /// Point `branch` at the commit.
    pub async fn move_ref(
        self,
        store: &dyn ObjectStore,
        branch: &BranchName,
    ) -> Result<RefUpdated, ComposeError> {
        let sha = &self.commit.commit_hash;

        let update = match &self.parent {
            Parent::HasParent(_) => match store.update_ref(branch, sha, true).await {
                Ok(()) => Ok(RefUpdate::Forced),
                Err(ForgeError::RefConflict(_)) => {
                    store.create_ref(branch, sha).await.map(|_| RefUpdate::Created)
                }
                Err(e) => Err(e),
            },
            Parent::NoParent => match store.create_ref(branch, sha).await {
                Ok(()) => Ok(RefUpdate::Created),
                Err(ForgeError::RefConflict(_)) => {
                    store.update_ref(branch, sha, true).await.map(|_| RefUpdate::Forced)
                }
                Err(e) => Err(e),
            },
        }
        .map_err(ComposeError::at(ComposeStage::UpdateRef))?;

        Ok(RefUpdated {
            commit: self.commit,
            update,
        })
    }
}

/// Run all four steps.
///
/// `blobs` must already be stored remotely.
pub async fn compose(
    store: &dyn ObjectStore,
    branch: &BranchName,
    message: &str,
    blobs: &[BlobRef],
) -> Result<RefUpdated, ComposeError> {
    Idle.resolve_parent(store, branch)
        .await?
        .create_tree(store, blobs)
        .await?
        .create_commit(store, message)
        .await?
        .move_ref(store, branch)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockObjectStore, MockOperation};

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    async fn stored_blobs(store: &MockObjectStore) -> Vec<BlobRef> {
        let a = store.create_blob(b"alpha").await.unwrap();
        let b = store.create_blob(b"beta").await.unwrap();
        store.clear_operations();
        vec![BlobRef::regular("a.txt", a), BlobRef::regular("dir/b.txt", b)]
    }

    fn ref_calls(store: &MockObjectStore) -> Vec<MockOperation> {
        store
            .operations()
            .into_iter()
            .filter(|op| {
                matches!(
                    op,
                    MockOperation::UpdateRef { .. } | MockOperation::CreateRef { .. }
                )
            })
            .collect()
    }

    mod first_commit {
        use super::*;

        #[tokio::test]
        async fn creates_ref_with_no_parents() {
            let store = MockObjectStore::new();
            let blobs = stored_blobs(&store).await;

            let done = compose(&store, &main(), "publish", &blobs).await.unwrap();

            assert_eq!(done.update, RefUpdate::Created);
            assert!(done.commit.parents().is_empty());
            assert_eq!(
                ref_calls(&store),
                vec![MockOperation::CreateRef {
                    branch: "main".into(),
                    sha: done.commit.commit_hash.clone(),
                }]
            );
            assert_eq!(store.ref_tip(&main()), Some(done.commit.commit_hash));
        }

        #[tokio::test]
        async fn resolves_no_parent() {
            let store = MockObjectStore::new();
            let resolved = Idle.resolve_parent(&store, &main()).await.unwrap();
            assert_eq!(resolved.parent, Parent::NoParent);
        }
    }

    mod existing_branch {
        use super::*;

        #[tokio::test]
        async fn forces_update_with_tip_as_parent() {
            let c0 = MockObjectStore::hash_blob(b"previous tip");
            let store = MockObjectStore::new().with_ref(&main(), c0.clone());
            let blobs = stored_blobs(&store).await;

            let done = compose(&store, &main(), "publish", &blobs).await.unwrap();

            assert_eq!(done.update, RefUpdate::Forced);
            assert_eq!(done.commit.parents(), vec![c0]);
            assert_eq!(
                ref_calls(&store),
                vec![MockOperation::UpdateRef {
                    branch: "main".into(),
                    sha: done.commit.commit_hash.clone(),
                    force: true,
                }]
            );
        }

        #[tokio::test]
        async fn tree_lists_every_blob_in_order() {
            let store = MockObjectStore::new();
            let blobs = stored_blobs(&store).await;

            let done = compose(&store, &main(), "publish", &blobs).await.unwrap();

            assert_eq!(store.tree(&done.commit.tree_hash).unwrap(), blobs);
            assert_eq!(done.commit.message, "publish");
        }
    }

    mod conflicts {
        use super::*;

        #[tokio::test]
        async fn branch_created_after_read_falls_back_to_update() {
            let other = MockObjectStore::hash_blob(b"other writer");
            let store = MockObjectStore::new().with_concurrent_write(&main(), other);
            let blobs = stored_blobs(&store).await;

            let done = compose(&store, &main(), "publish", &blobs).await.unwrap();

            assert_eq!(done.update, RefUpdate::Forced);
            let calls = ref_calls(&store);
            assert_eq!(calls.len(), 2);
            assert!(matches!(calls[0], MockOperation::CreateRef { .. }));
            assert!(matches!(calls[1], MockOperation::UpdateRef { force: true, .. }));
            assert_eq!(store.ref_tip(&main()), Some(done.commit.commit_hash));
        }

        #[tokio::test]
        async fn branch_deleted_after_read_falls_back_to_create() {
            let c0 = MockObjectStore::hash_blob(b"tip");
            let store = MockObjectStore::new()
                .with_ref(&main(), c0.clone())
                .with_concurrent_delete(&main());
            let blobs = stored_blobs(&store).await;

            let done = compose(&store, &main(), "publish", &blobs).await.unwrap();

            assert_eq!(done.update, RefUpdate::Created);
            assert_eq!(done.commit.parents(), vec![c0]);
            let calls = ref_calls(&store);
            assert_eq!(calls.len(), 2);
            assert!(matches!(calls[0], MockOperation::UpdateRef { force: true, .. }));
            assert!(matches!(calls[1], MockOperation::CreateRef { .. }));
        }

        #[tokio::test]
        async fn non_conflict_ref_error_not_retried() {
            let store = MockObjectStore::new().fail_on(FailOn::CreateRef(ForgeError::ApiError {
                status: 403,
                message: "Resource not accessible by integration".into(),
            }));
            let blobs = stored_blobs(&store).await;

            let err = compose(&store, &main(), "publish", &blobs)
                .await
                .unwrap_err();

            assert_eq!(err.stage, ComposeStage::UpdateRef);
            assert_eq!(ref_calls(&store).len(), 1);
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn tree_failure_stops_before_commit() {
            let store = MockObjectStore::new()
                .fail_on(FailOn::CreateTree(ForgeError::RateLimited));
            let blobs = stored_blobs(&store).await;

            let err = compose(&store, &main(), "publish", &blobs)
                .await
                .unwrap_err();

            assert_eq!(err.stage, ComposeStage::CreateTree);
            assert!(!store
                .operations()
                .iter()
                .any(|op| matches!(op, MockOperation::CreateCommit { .. })));
            assert!(ref_calls(&store).is_empty());
        }

        #[tokio::test]
        async fn commit_failure_leaves_ref_untouched() {
            let c0 = MockObjectStore::hash_blob(b"tip");
            let store = MockObjectStore::new()
                .with_ref(&main(), c0.clone())
                .fail_on(FailOn::CreateCommit(ForgeError::ApiError {
                    status: 500,
                    message: "boom".into(),
                }));
            let blobs = stored_blobs(&store).await;

            let err = compose(&store, &main(), "publish", &blobs)
                .await
                .unwrap_err();

            assert_eq!(err.stage, ComposeStage::CreateCommit);
            assert!(ref_calls(&store).is_empty());
            assert_eq!(store.ref_tip(&main()), Some(c0));
        }

        #[tokio::test]
        async fn parent_read_failure_is_reported() {
            let store = MockObjectStore::new().fail_on(FailOn::GetRef(ForgeError::AuthFailed(
                "Invalid or expired token".into(),
            )));

            let err = compose(&store, &main(), "publish", &[]).await.unwrap_err();
            assert_eq!(err.stage, ComposeStage::ResolveParent);
            assert!(err.to_string().starts_with("resolve parent failed"));
        }
    }
}
