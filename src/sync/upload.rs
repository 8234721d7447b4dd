//! sync::upload
//!
//! Blob uploads with bounded concurrency.
//!
//! # Design
//!
//! Each surviving [`FileRecord`] becomes one task on a `JoinSet`. A
//! semaphore caps how many tasks hold an HTTP request in flight. Every
//! file is attempted, so the outcome accounts for each record exactly once,
//! either as a [`BlobRef`] or as an [`UploadError`]. Results keep the
//! enumeration order regardless of completion order.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::ProgressSink;
use crate::core::types::{BlobRef, FileRecord};
use crate::forge::{ForgeError, ObjectStore};

/// A single file failed to upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file could not be read (vanished or unreadable since enumeration).
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote store rejected the blob.
    #[error("upload of {path} rejected: {source}")]
    Remote {
        path: String,
        #[source]
        source: ForgeError,
    },
}

impl UploadError {
    /// Relative path of the file that failed.
    pub fn path(&self) -> &str {
        match self {
            UploadError::Io { path, .. } | UploadError::Remote { path, .. } => path,
        }
    }

    /// HTTP status for remote rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Io { .. } => None,
            UploadError::Remote { source, .. } => source.status(),
        }
    }
}

/// Read one file and store it as a blob.
///
/// The blob is always recorded as a regular file (`100644`).
///
/// # Errors
///
/// - [`UploadError::Io`] if the file cannot be read
/// - [`UploadError::Remote`] if the store rejects the blob
pub async fn upload(file: &FileRecord, store: &dyn ObjectStore) -> Result<BlobRef, UploadError> {
    let content = tokio::fs::read(&file.absolute_path)
        .await
        .map_err(|source| UploadError::Io {
            path: file.relative_path.clone(),
            source,
        })?;

    let content_hash = store
        .create_blob(&content)
        .await
        .map_err(|source| UploadError::Remote {
            path: file.relative_path.clone(),
            source,
        })?;

    Ok(BlobRef::regular(file.relative_path.clone(), content_hash))
}

/// Result of uploading a batch of files.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Successful uploads, in enumeration order.
    pub blobs: Vec<BlobRef>,
    /// Failed uploads, in enumeration order.
    pub failures: Vec<UploadError>,
}

impl UploadOutcome {
    /// Number of files attempted.
    pub fn attempted(&self) -> usize {
        self.blobs.len() + self.failures.len()
    }
}

/// Uploads files to an object store, at most `concurrency` at a time.
pub struct BlobUploader {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
}

impl BlobUploader {
    /// Create an uploader. A `concurrency` of zero is treated as one.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        concurrency: usize,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            progress,
        }
    }

    /// Upload every file and wait for all of them to finish.
    pub async fn upload_all(&self, files: Vec<FileRecord>) -> UploadOutcome {
        let total = files.len();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, file) in files.into_iter().enumerate() {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&permits);
            let progress = Arc::clone(&self.progress);

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await;
                let result = upload(&file, store.as_ref()).await;
                match &result {
                    Ok(blob) => progress.blob_uploaded(blob),
                    Err(err) => progress.upload_failed(err),
                }
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<BlobRef, UploadError>>> =
            std::iter::repeat_with(|| None).take(total).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                // Tasks are never aborted
                Err(_) => {}
            }
        }

        let mut outcome = UploadOutcome::default();
        for result in slots.into_iter().flatten() {
            match result {
                Ok(blob) => outcome.blobs.push(blob),
                Err(err) => outcome.failures.push(err),
            }
        }
        outcome
    }
}
