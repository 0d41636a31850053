//! Multipart form decoding
//!
//! The upload form posts two fields: the file part and an optional target
//! directory. When the target arrives first the file part is streamed
//! straight to its destination. Otherwise it is spooled to a temp file
//! until the end of the form, then copied once the destination is known.

use super::pipeline::{UploadPipeline, UploadRequest};
use super::spool::SpooledPart;
use super::{StoredUpload, UploadError};
use crate::metrics;
use bytes::Bytes;
use futures::Stream;
use std::io;
use tracing::{debug, error, warn};

/// Multipart field holding the file
pub const FILE_FIELD: &str = "filebrowser";

/// Multipart field holding the destination directory
pub const TARGET_FIELD: &str = "target_loc";

/// Decode a `multipart/form-data` body and store its file part
pub async fn receive<S, E>(
    pipeline: &UploadPipeline,
    content_type: Option<&str>,
    body: S,
) -> Result<StoredUpload, UploadError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = content_type.ok_or_else(|| form_error("missing Content-Type header"))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| form_error(format!("not a multipart form ({})", e)))?;

    let mut multipart = multer::Multipart::new(body, boundary);
    let mut target: Option<String> = None;
    let mut spooled: Option<(String, SpooledPart)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(format!("failed to parse multipart field: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                if spooled.is_some() {
                    return Err(form_error("multiple file parts are not supported"));
                }
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| form_error(format!("field '{}' is not a file", FILE_FIELD)))?;

                if let Some(target) = &target {
                    debug!(file_name = %file_name, "Streaming file part to disk");
                    return pipeline
                        .store(UploadRequest::new(field, file_name, target.clone()))
                        .await;
                }

                debug!(file_name = %file_name, "File part precedes target, spooling");
                let mut spool = SpooledPart::create()
                    .await
                    .map_err(|e| spool_error(&file_name, e))?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| form_error(format!("failed reading file part: {}", e)))?
                {
                    spool
                        .write(&chunk)
                        .await
                        .map_err(|e| spool_error(&file_name, e))?;
                }
                debug!(bytes = spool.size(), "File part spooled");
                spooled = Some((file_name, spool));
            }
            Some(TARGET_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| form_error(format!("invalid {} field: {}", TARGET_FIELD, e)))?;
                target = Some(value);
            }
            _ => {
                while field
                    .chunk()
                    .await
                    .map_err(|e| form_error(format!("failed draining field: {}", e)))?
                    .is_some()
                {}
            }
        }
    }

    let (file_name, spool) = spooled
        .ok_or_else(|| form_error(format!("missing file field '{}'", FILE_FIELD)))?;
    let body = spool
        .into_stream()
        .await
        .map_err(|e| spool_error(&file_name, e))?;

    pipeline
        .store(UploadRequest::new(
            body,
            file_name,
            target.unwrap_or_default(),
        ))
        .await
}

/// Build, log and count a form decoding failure
fn form_error(detail: impl Into<String>) -> UploadError {
    let err = UploadError::FormParse(detail.into());
    metrics::record_upload_failure(err.stage().as_str());
    warn!(error = %err, "Upload form rejected");
    err
}

fn spool_error(file_name: &str, source: io::Error) -> UploadError {
    let err = UploadError::Spool {
        name: file_name.to_string(),
        source,
    };
    metrics::record_upload_failure(err.stage().as_str());
    error!(error = %err, "Upload spool failed");
    err
}
