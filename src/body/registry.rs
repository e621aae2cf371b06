//! Process-wide record of live spool files.
//!
//! Spool files normally disappear when their last [`SpooledFile`](super::SpooledFile)
//! handle drops. This registry is the fallback for paths that never got that
//! far (aborted tasks, leaked handles): the binary purges it on exit.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

static SPOOL_REGISTRY: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

fn registry() -> MutexGuard<'static, HashSet<PathBuf>> {
    SPOOL_REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn register(path: &Path) {
    registry().insert(path.to_path_buf());
}

pub(crate) fn unregister(path: &Path) {
    registry().remove(path);
}

/// Returns true if `path` is a spool file that has not been deleted yet.
#[must_use]
pub fn is_registered(path: &Path) -> bool {
    registry().contains(path)
}

/// Deletes every spool file still registered and returns how many were removed.
///
/// Files that are already gone are skipped silently. Any [`ByteSource`](super::ByteSource)
/// still pointing at a purged file fails on its next read.
pub fn purge_spooled_files() -> usize {
    let paths: Vec<PathBuf> = registry().drain().collect();
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "purged spool file");
                removed += 1;
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to purge spool file");
            }
        }
    }
    removed
}
