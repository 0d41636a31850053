//! Disk spool for a file part that arrives before its destination
//!
//! The part is written to an anonymous temp file as it is received and read
//! back in fixed-size chunks once the destination is known. The temp file
//! is unlinked by the OS when the handle is dropped.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::io::{self, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Read-back chunk size
const CHUNK_SIZE: usize = 64 * 1024;

/// A file part parked on disk
pub(crate) struct SpooledPart {
    file: File,
    size: u64,
}

impl SpooledPart {
    /// Open an empty spool in the system temp directory
    pub(crate) async fn create() -> io::Result<Self> {
        let file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(io::Error::other)??;
        Ok(Self {
            file: File::from_std(file),
            size: 0,
        })
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Rewind and stream the spooled bytes back
    pub(crate) async fn into_stream(
        mut self,
    ) -> io::Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static> {
        self.file.flush().await?;
        self.file.seek(SeekFrom::Start(0)).await?;

        Ok(futures::stream::try_unfold(self.file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
            if file.read_buf(&mut buf).await? == 0 {
                return Ok(None);
            }
            Ok(Some((buf.freeze(), file)))
        }))
    }
}
