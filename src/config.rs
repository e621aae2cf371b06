//! Tunables for body materialization.

use std::path::PathBuf;

/// Default in-memory/spool-to-disk threshold (10 MiB).
///
/// Bodies with a declared length above this, or with no declared length at
/// all, are spooled to a temporary file.
pub const MAX_IN_MEMORY_BODY_STREAM_BYTES: u64 = 10 * 1024 * 1024;

/// Prefix for spool file names.
pub const SPOOL_FILE_PREFIX: &str = "rmhttp";

/// Suffix for spool file names.
pub const SPOOL_FILE_SUFFIX: &str = ".tmp";

/// Per-exchange mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Largest declared body length that is still buffered in memory.
    pub max_in_memory_body_bytes: u64,
    /// Directory for spool files. `None` uses the OS temp directory.
    pub spool_dir: Option<PathBuf>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_in_memory_body_bytes: MAX_IN_MEMORY_BODY_STREAM_BYTES,
            spool_dir: None,
        }
    }
}

impl MapperConfig {
    /// Returns a config with the given in-memory threshold and default spool directory.
    #[must_use]
    pub fn with_threshold(max_in_memory_body_bytes: u64) -> Self {
        Self {
            max_in_memory_body_bytes,
            ..Self::default()
        }
    }

    /// Sets the spool directory.
    #[must_use]
    pub fn spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    /// Resolves the directory spool files are created in.
    #[must_use]
    pub fn resolved_spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Whether a body with the given declared length should be spooled to disk.
    ///
    /// `None` means the transport did not know the length.
    #[must_use]
    pub fn should_spool(&self, declared_length: Option<u64>) -> bool {
        declared_length.is_none_or(|len| len > self.max_in_memory_body_bytes)
    }
}
