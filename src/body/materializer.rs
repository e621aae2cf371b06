//! Buffers a response body in memory or spools it to a temp file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::registry;
use super::source::{ByteSource, SpooledFile};
use crate::config::{MapperConfig, SPOOL_FILE_PREFIX, SPOOL_FILE_SUFFIX};
use crate::error::MapError;

/// A response body that can be pulled chunk by chunk.
#[async_trait]
pub trait BodyStream: Send {
    /// Returns the next chunk, or `None` once the body is exhausted.
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// Drains `body` into a [`ByteSource`].
///
/// Bodies with an unknown length (`None`) or a declared length above
/// [`MapperConfig::max_in_memory_body_bytes`] are spooled to a new, uniquely
/// named temp file. Everything else is buffered in memory.
///
/// # Errors
///
/// Returns [`MapError::Drain`] if reading the body fails and
/// [`MapError::Spool`] if the spool file cannot be created or written. A
/// partially written spool file is deleted before the error is returned.
#[instrument(level = "debug", skip(body, config))]
pub async fn materialize<B>(
    declared_length: Option<u64>,
    body: &mut B,
    config: &MapperConfig,
) -> Result<ByteSource, MapError>
where
    B: BodyStream + ?Sized,
{
    if config.should_spool(declared_length) {
        spool_to_file(body, &config.resolved_spool_dir()).await
    } else {
        read_to_memory(body, declared_length).await
    }
}

async fn read_to_memory<B>(body: &mut B, declared_length: Option<u64>) -> Result<ByteSource, MapError>
where
    B: BodyStream + ?Sized,
{
    let capacity = declared_length
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0);
    let mut buffer = BytesMut::with_capacity(capacity);

    while let Some(chunk) = body.next_chunk().await.map_err(MapError::drain)? {
        buffer.extend_from_slice(&chunk);
    }

    debug!(bytes = buffer.len(), "buffered response body in memory");
    Ok(ByteSource::InMemory(buffer.freeze()))
}

async fn spool_to_file<B>(body: &mut B, spool_dir: &Path) -> Result<ByteSource, MapError>
where
    B: BodyStream + ?Sized,
{
    let named = tempfile::Builder::new()
        .prefix(SPOOL_FILE_PREFIX)
        .suffix(SPOOL_FILE_SUFFIX)
        .tempfile_in(spool_dir)
        .map_err(|e| MapError::spool(spool_dir, e))?;
    let (file, temp_path) = named.into_parts();
    let pending = PendingSpool::new(temp_path);

    let len = write_chunks(File::from_std(file), body, pending.path()).await?;
    let temp_path = pending.keep()?;
    debug!(path = %temp_path.display(), bytes = len, "spooled response body to disk");
    Ok(ByteSource::SpooledFile(Arc::new(SpooledFile::new(
        temp_path, len,
    ))))
}

/// A registered spool file that is still being written.
///
/// Dropped without [`PendingSpool::keep`] (on error, or when the materializing
/// future is cancelled) it unregisters and deletes the file.
struct PendingSpool {
    path: PathBuf,
    temp_path: Option<TempPath>,
}

impl PendingSpool {
    fn new(temp_path: TempPath) -> Self {
        registry::register(&temp_path);
        Self {
            path: temp_path.to_path_buf(),
            temp_path: Some(temp_path),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Hands the fully written file over; it stays registered.
    fn keep(mut self) -> Result<TempPath, MapError> {
        self.temp_path.take().ok_or_else(|| {
            MapError::spool(
                &self.path,
                io::Error::other("spool file already handed over"),
            )
        })
    }
}

impl Drop for PendingSpool {
    fn drop(&mut self) {
        if let Some(temp_path) = self.temp_path.take() {
            discard(temp_path);
        }
    }
}

/// Copies the body into the spool file, returning bytes written.
///
/// Kept separate so the caller can clean up on any error.
async fn write_chunks<B>(file: File, body: &mut B, path: &Path) -> Result<u64, MapError>
where
    B: BodyStream + ?Sized,
{
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next_chunk().await.map_err(MapError::drain)? {
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| MapError::spool(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| MapError::spool(path, e))?;
    Ok(bytes_written)
}

fn discard(temp_path: TempPath) {
    let path = temp_path.to_path_buf();
    registry::unregister(&path);
    match temp_path.close() {
        Ok(()) => debug!(path = %path.display(), "removed partial spool file"),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to remove partial spool file");
        }
    }
}
