//! Idempotent filesystem cleanup helpers.
//!
//! Session files must be deleted exactly once on every exit path; these
//! helpers make a second deletion attempt a no-op rather than an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Remove a file if it exists. Returns whether a file was removed.
pub fn remove_file_if_exists(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("failed to remove {}: {e}", path.display());
            false
        }
    }
}

/// Remove a list of files, ignoring missing ones.
pub fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        remove_file_if_exists(path);
    }
}
