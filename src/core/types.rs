//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier as returned by the remote store
//! - [`FileMode`] / [`ObjectKind`] - Tree entry attributes
//! - [`FileRecord`] - One tracked file in the local working tree
//! - [`BlobRef`] - One uploaded file, ready to be placed in a tree
//! - [`TreeRef`] / [`CommitRef`] - Remote objects created by a publish run
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use gitsnap::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("main").unwrap();
//! assert_eq!(branch.ref_path(), "heads/main");
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use gitsnap::core::types::BranchName;
///
/// let name = BranchName::new("release/2024").unwrap();
/// assert_eq!(name.as_str(), "release/2024");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short ref path used by the git data API (`heads/<name>`).
    pub fn ref_path(&self) -> String {
        format!("heads/{}", self.0)
    }

    /// The fully qualified ref name (`refs/heads/<name>`).
    pub fn full_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl Default for BranchName {
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use gitsnap::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex string.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get the OID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tree entry mode.
///
/// Only regular files are published; executable bits and symlinks are
/// flattened to [`FileMode::Regular`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileMode {
    /// `100644`
    #[default]
    #[serde(rename = "100644")]
    Regular,
}

impl FileMode {
    /// The octal mode string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[default]
    Blob,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
        }
    }
}

/// One tracked file in the local working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the working tree root, `/`-separated.
    pub relative_path: String,
    /// Absolute path on the local filesystem.
    pub absolute_path: PathBuf,
}

impl FileRecord {
    /// Build a record for `relative_path` under `workdir`.
    pub fn new(workdir: &std::path::Path, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let absolute_path = workdir.join(&relative_path);
        Self {
            relative_path,
            absolute_path,
        }
    }
}

/// A file whose content has been stored remotely as a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Path of the file relative to the tree root.
    pub path: String,
    /// Content hash assigned by the remote store.
    pub content_hash: Oid,
    pub mode: FileMode,
    pub kind: ObjectKind,
}

impl BlobRef {
    /// A regular-file blob entry.
    pub fn regular(path: impl Into<String>, content_hash: Oid) -> Self {
        Self {
            path: path.into(),
            content_hash,
            mode: FileMode::Regular,
            kind: ObjectKind::Blob,
        }
    }
}

/// A tree object created remotely from a full set of [`BlobRef`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRef {
    pub tree_hash: Oid,
}

/// A commit object created remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub commit_hash: Oid,
    pub tree_hash: Oid,
    /// `None` only for the first commit on the target branch.
    pub parent_hash: Option<Oid>,
    pub message: String,
}

impl CommitRef {
    /// Parent list as submitted to the remote (`[]` or `[parent]`).
    pub fn parents(&self) -> Vec<Oid> {
        self.parent_hash.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn invalid_branch_names() {
            for bad in [
                "",
                "@",
                ".hidden",
                "foo/.hidden",
                "-flag",
                "branch.lock",
                "foo/bar.lock",
                "branch/",
                "bad..path",
                "foo@{bar",
                "foo//bar",
                "has space",
                "tilde~",
                "ctrl\u{7}",
            ] {
                assert!(BranchName::new(bad).is_err(), "accepted {bad:?}");
            }
        }

        #[test]
        fn ref_paths() {
            let name = BranchName::new("main").unwrap();
            assert_eq!(name.ref_path(), "heads/main");
            assert_eq!(name.full_ref(), "refs/heads/main");
        }

        #[test]
        fn default_is_main() {
            assert_eq!(BranchName::default().as_str(), "main");
        }

        #[test]
        fn deserializes_with_validation() {
            let ok: Result<BranchName, _> = serde_json::from_str("\"main\"");
            assert!(ok.is_ok());
            let bad: Result<BranchName, _> = serde_json::from_str("\"a..b\"");
            assert!(bad.is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn sha1_and_sha256_accepted() {
            assert!(Oid::new("a".repeat(40)).is_ok());
            assert!(Oid::new("b".repeat(64)).is_ok());
        }

        #[test]
        fn wrong_length_rejected() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("a".repeat(41)).is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn normalized_to_lowercase() {
            let oid = Oid::new("ABCDEF".repeat(6) + "ABCD").unwrap();
            assert_eq!(oid.as_str(), "abcdef".repeat(6) + "abcd");
        }

        #[test]
        fn short_clamps_to_length() {
            let oid = Oid::new("c".repeat(40)).unwrap();
            assert_eq!(oid.short(7), "ccccccc");
            assert_eq!(oid.short(100).len(), 40);
        }
    }

    mod records {
        use super::*;
        use std::path::Path;

        #[test]
        fn file_record_joins_workdir() {
            let rec = FileRecord::new(Path::new("/work"), "src/lib.rs");
            assert_eq!(rec.relative_path, "src/lib.rs");
            assert_eq!(rec.absolute_path, Path::new("/work/src/lib.rs"));
        }

        #[test]
        fn regular_blob_defaults() {
            let blob = BlobRef::regular("a.txt", Oid::new("d".repeat(40)).unwrap());
            assert_eq!(blob.mode.as_str(), "100644");
            assert_eq!(blob.kind.as_str(), "blob");
        }

        #[test]
        fn commit_parents_list() {
            let tree = Oid::new("1".repeat(40)).unwrap();
            let parent = Oid::new("2".repeat(40)).unwrap();
            let root = CommitRef {
                commit_hash: Oid::new("3".repeat(40)).unwrap(),
                tree_hash: tree.clone(),
                parent_hash: None,
                message: "m".into(),
            };
            assert!(root.parents().is_empty());

            let child = CommitRef {
                parent_hash: Some(parent.clone()),
                ..root
            };
            assert_eq!(child.parents(), vec![parent]);
        }

        #[test]
        fn mode_serializes_as_octal_string() {
            assert_eq!(
                serde_json::to_string(&FileMode::Regular).unwrap(),
                "\"100644\""
            );
            assert_eq!(serde_json::to_string(&ObjectKind::Blob).unwrap(), "\"blob\"");
        }
    }
}
