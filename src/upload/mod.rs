//! Upload module
//!
//! Stores files posted through the upload form under the storage root.
//!
//! ```text
//! multipart body ──► form::receive ──► UploadPipeline::store
//!                      └─ spool           ├─ path::resolve_destination
//!                                         ├─ create_dir_all
//!                                         ├─ File::create
//!                                         └─ stream copy
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod form;
pub mod path;
pub mod pipeline;
mod spool;

pub use form::{receive, FILE_FIELD, TARGET_FIELD};
pub use pipeline::{UploadPipeline, UploadRequest};

/// Pipeline stage an upload failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStage {
    FormParse,
    DirectoryCreate,
    FileCreate,
    StreamCopy,
}

impl UploadStage {
    /// Stable lowercase name, used in logs and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStage::FormParse => "form_parse",
            UploadStage::DirectoryCreate => "directory_create",
            UploadStage::FileCreate => "file_create",
            UploadStage::StreamCopy => "stream_copy",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload errors
///
/// The `Display` text carries full detail for the log. Clients get
/// [`UploadError::client_message`], which leaves out OS error text and
/// filesystem paths.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Error receiving data: {0}")]
    FormParse(String),

    #[error("Invalid target location \"{target}\": {reason}")]
    InvalidDestination { target: String, reason: String },

    #[error("Error creating parent directory \"{target}\" at {path}: {source}")]
    DirectoryCreate {
        target: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name \"{0}\"")]
    InvalidFileName(String),

    #[error("Error creating file \"{name}\" at {path}: {source}")]
    FileCreate {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error writing to file \"{name}\" at {path}: {source}")]
    StreamCopy {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error spooling file \"{name}\" to a temp file: {source}")]
    Spool {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// Stage that produced this error
    pub fn stage(&self) -> UploadStage {
        match self {
            UploadError::FormParse(_) | UploadError::InvalidDestination { .. } => {
                UploadStage::FormParse
            }
            UploadError::DirectoryCreate { .. } => UploadStage::DirectoryCreate,
            UploadError::InvalidFileName(_) | UploadError::FileCreate { .. } => {
                UploadStage::FileCreate
            }
            UploadError::StreamCopy { .. } | UploadError::Spool { .. } => UploadStage::StreamCopy,
        }
    }

    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::FormParse(_)
                | UploadError::InvalidDestination { .. }
                | UploadError::InvalidFileName(_)
        )
    }

    /// Message safe to send back to the uploader
    pub fn client_message(&self) -> String {
        match self {
            UploadError::FormParse(detail) => format!("Error receiving data: {}", detail),
            UploadError::InvalidDestination { target, reason } => {
                format!("Invalid target location \"{}\": {}", target, reason)
            }
            UploadError::DirectoryCreate { target, .. } => {
                format!("Error creating parent directory \"{}\"", target)
            }
            UploadError::InvalidFileName(name) => format!("Invalid file name \"{}\"", name),
            UploadError::FileCreate { name, .. } => format!("Error creating file \"{}\"", name),
            UploadError::StreamCopy { name, .. } | UploadError::Spool { name, .. } => {
                format!("Error writing to file \"{}\"", name)
            }
        }
    }
}

/// A successfully stored upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// URL path that serves the file back, e.g. `/docs/a.txt`
    pub served_path: String,
    /// Where the file was written
    pub location: PathBuf,
    pub bytes_written: u64,
}
