//! Upload store pipeline
//!
//! One pass per request, no retries:
//!
//! ```text
//! Start ─► DestinationResolved ─► DirEnsured ─► FileCreated ─► Copied ─► Done
//!   └──────────────┴──────────────────┴──────────────┴────────────┴─► Failed(stage)
//! ```
//!
//! A failed copy leaves the partially written file in place. An existing
//! symlink at the destination file name is never written through.

use super::path::{is_within_root, resolve_destination, sanitize_file_name};
use super::{StoredUpload, UploadError};
use crate::metrics;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// One file to store
pub struct UploadRequest<S> {
    /// File contents as a stream of chunks
    pub body: S,
    /// File name as sent by the client
    pub file_name: String,
    /// `target_loc` as sent by the client; empty means the storage root
    pub destination: String,
}

impl<S> UploadRequest<S> {
    pub fn new(body: S, file_name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            body,
            file_name: file_name.into(),
            destination: destination.into(),
        }
    }
}

/// Writes uploads below a storage root
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    root: PathBuf,
}

impl UploadPipeline {
    /// Create a pipeline storing under `root`
    ///
    /// The root is created on first use if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store one upload
    ///
    /// The body stream is consumed (and dropped) on every exit path. Any
    /// existing file at the destination is overwritten. Failures are logged
    /// before they are returned.
    #[tracing::instrument(
        name = "upload.store",
        skip(self, request),
        fields(
            upload.file_name = %request.file_name,
            upload.destination = %request.destination,
        )
    )]
    pub async fn store<S, E>(&self, request: UploadRequest<S>) -> Result<StoredUpload, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let start = Instant::now();
        let result = self.run(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(stored) => {
                metrics::record_upload_success(stored.bytes_written, duration.as_secs_f64());
                info!(
                    served_path = %stored.served_path,
                    bytes_written = stored.bytes_written,
                    duration_ms = duration.as_millis(),
                    "Upload stored"
                );
            }
            Err(e) => {
                metrics::record_upload_failure(e.stage().as_str());
                error!(stage = %e.stage(), error = %e, "Upload failed");
            }
        }

        result
    }

    async fn run<S, E>(&self, request: UploadRequest<S>) -> Result<StoredUpload, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let UploadRequest {
            body,
            file_name,
            destination,
        } = request;

        let destination = resolve_destination(&self.root, &destination)?;
        let file_name = sanitize_file_name(&file_name)?;
        info!(dir = %destination.dir.display(), "Destination resolved");

        self.ensure_dir(&destination.relative(), &destination.dir)
            .await?;
        info!("Destination directory ready");

        let location = destination.dir.join(&file_name);
        let create_error = |source| UploadError::FileCreate {
            name: file_name.clone(),
            path: location.clone(),
            source,
        };
        // An existing symlink would be followed out of the root.
        if let Ok(metadata) = fs::symlink_metadata(&location).await {
            if metadata.file_type().is_symlink() {
                return Err(create_error(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "destination is a symbolic link",
                )));
            }
        }
        let mut file = File::create(&location).await.map_err(create_error)?;
        info!(path = %location.display(), "File created");

        let copy_error = |source| UploadError::StreamCopy {
            name: file_name.clone(),
            path: location.clone(),
            source,
        };

        let mut body = std::pin::pin!(body);
        let mut bytes_written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| copy_error(io::Error::other(e)))?;
            file.write_all(&chunk).await.map_err(copy_error)?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(copy_error)?;
        info!(bytes_written, "Stream copied");

        Ok(StoredUpload {
            served_path: destination.served_path(&file_name),
            location,
            bytes_written,
        })
    }

    /// Create `dir` and any missing ancestors, refusing to leave the root
    async fn ensure_dir(&self, target: &str, dir: &Path) -> Result<(), UploadError> {
        let create_error = |path: &Path, source| UploadError::DirectoryCreate {
            target: target.to_string(),
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| create_error(&self.root, e))?;

        let root = self.root.clone();
        let candidate = dir.to_path_buf();
        let contained = tokio::task::spawn_blocking(move || is_within_root(&root, &candidate))
            .await
            .map_err(|e| create_error(dir, io::Error::other(e)))?
            .map_err(|e| create_error(dir, e))?;
        if !contained {
            return Err(UploadError::InvalidDestination {
                target: target.to_string(),
                reason: "resolves outside the storage root".to_string(),
            });
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|e| create_error(dir, e))
    }
}
