//! forge
//!
//! Abstraction over the hosting service's low-level object store.
//!
//! # Architecture
//!
//! The `ObjectStore` trait covers exactly the git data operations a publish
//! run needs: blobs, trees, commits, and refs, plus an identity check. The
//! sync pipeline depends only on the trait, so it runs unchanged against
//! GitHub or the in-memory mock.
//!
//! # Modules
//!
//! - `traits`: Core `ObjectStore` trait and request/error types
//! - [`github`]: GitHub implementation over the REST git data API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::forge::github::GitHubObjectStore;
//! use gitsnap::forge::ObjectStore;
//!
//! let store = GitHubObjectStore::new(token, "octocat", "hello-world");
//! let login = store.authenticated_user().await?;
//! println!("Authenticated as: {}", login);
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
