//! Re-readable handles to response body bytes.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, warn};

use super::registry;
use crate::content_type::Charset;
use crate::error::MapError;

/// Response body bytes, held either in memory or in a spool file.
///
/// Cloning is cheap: in-memory buffers are reference-counted and spooled
/// sources share one [`SpooledFile`]. Reads never modify the underlying data.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// The whole body buffered in memory.
    InMemory(Bytes),
    /// The body written to a temporary file.
    SpooledFile(Arc<SpooledFile>),
}

impl Default for ByteSource {
    fn default() -> Self {
        Self::empty()
    }
}

impl ByteSource {
    /// An empty in-memory source.
    #[must_use]
    pub fn empty() -> Self {
        Self::InMemory(Bytes::new())
    }

    /// Size of the body in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::InMemory(bytes) => bytes.len() as u64,
            Self::SpooledFile(file) => file.len(),
        }
    }

    /// Returns true if the body has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the body lives in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// Path of the spool file, if the body was spooled.
    #[must_use]
    pub fn spool_path(&self) -> Option<&Path> {
        match self {
            Self::InMemory(_) => None,
            Self::SpooledFile(file) => Some(file.path()),
        }
    }

    /// Reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the spool file cannot be read.
    pub async fn read_all(&self) -> io::Result<Bytes> {
        match self {
            Self::InMemory(bytes) => Ok(bytes.clone()),
            Self::SpooledFile(file) => tokio::fs::read(file.path()).await.map(Bytes::from),
        }
    }

    /// Opens an independent reader positioned at the start of the body.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the spool file cannot be opened.
    pub async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Self::InMemory(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            Self::SpooledFile(file) => {
                let handle = tokio::fs::File::open(file.path()).await?;
                Ok(Box::new(BufReader::new(handle)))
            }
        }
    }

    /// Reads and decodes the whole body with `charset`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Decode`] if the bytes cannot be read.
    pub async fn read_to_string(&self, charset: &Charset) -> Result<String, MapError> {
        let bytes = self
            .read_all()
            .await
            .map_err(|e| MapError::decode(charset.name(), e))?;
        Ok(charset.decode(&bytes))
    }

    /// Streams the body into `writer`, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an IO error if reading the source or writing fails.
    pub async fn copy_to<W>(&self, writer: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut reader = self.open().await?;
        tokio::io::copy(&mut reader, writer).await
    }

    /// Deletes the spool file now instead of waiting for the last handle to drop.
    ///
    /// No-op for in-memory sources. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an IO error if an existing spool file cannot be removed.
    pub fn release(&self) -> io::Result<()> {
        match self {
            Self::InMemory(_) => Ok(()),
            Self::SpooledFile(file) => file.delete(),
        }
    }
}

impl Serialize for ByteSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::InMemory(bytes) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("storage", "memory")?;
                map.serialize_entry("size", &bytes.len())?;
                map.end()
            }
            Self::SpooledFile(file) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("storage", "file")?;
                map.serialize_entry("size", &file.len())?;
                map.serialize_entry("path", &file.path().display().to_string())?;
                map.end()
            }
        }
    }
}

/// A spooled body on disk, deleted when the last handle drops.
pub struct SpooledFile {
    path: PathBuf,
    len: u64,
    temp_path: Mutex<Option<TempPath>>,
}

impl SpooledFile {
    /// Takes ownership of a fully written temp file. The path must already be
    /// in the spool registry.
    pub(crate) fn new(temp_path: TempPath, len: u64) -> Self {
        Self {
            path: temp_path.to_path_buf(),
            len,
            temp_path: Mutex::new(Some(temp_path)),
        }
    }

    /// Location of the spool file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written to the spool file.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deletes the file. Idempotent; a file removed behind our back is not an error.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be removed.
    pub fn delete(&self) -> io::Result<()> {
        let taken = self
            .temp_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(temp_path) = taken else {
            return Ok(());
        };

        registry::unregister(&self.path);
        match temp_path.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "deleted spool file");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        if let Err(error) = self.delete() {
            warn!(path = %self.path.display(), error = %error, "failed to delete spool file");
        }
    }
}

impl fmt::Debug for SpooledFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpooledFile")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
