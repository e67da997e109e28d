//! Directory helpers

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, instrument, warn};

use crate::error::FsError;

/// List entry names in `dir`, sorted
///
/// # Errors
/// Returns `FsError` if the directory cannot be read
pub fn list_dir(dir: impl AsRef<Path>) -> Result<Vec<String>, FsError> {
    let dir = dir.as_ref();
    let mut names = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect::<io::Result<Vec<_>>>()
        })
        .map_err(|e| {
            error!(path = %dir.display(), error = %e, "failed to list directory");
            FsError::io(dir, &e)
        })?;
    names.sort();
    debug!(path = %dir.display(), entries = ?names, "listed directory");
    Ok(names)
}

/// Check whether `dir` has an entry called `name`
///
/// # Errors
/// Returns `FsError` if the directory cannot be read
pub fn dir_contains(dir: impl AsRef<Path>, name: &str) -> Result<bool, FsError> {
    Ok(list_dir(dir)?.iter().any(|entry| entry == name))
}

/// Create one directory level, optionally with explicit mode bits
///
/// # Errors
/// Returns `FsError::AlreadyExists`, `FsError::NotFound` (missing parent) etc.
pub fn make_dir(path: impl AsRef<Path>, mode: Option<u32>) -> Result<(), FsError> {
    build_dir(path.as_ref(), mode, false)
}

/// Create a directory and any missing parents
///
/// # Errors
/// Returns `FsError` if any level cannot be created
pub fn make_dirs(path: impl AsRef<Path>, mode: Option<u32>) -> Result<PathBuf, FsError> {
    let path = path.as_ref();
    build_dir(path, mode, true)?;
    Ok(path.to_path_buf())
}

fn build_dir(path: &Path, mode: Option<u32>, recursive: bool) -> Result<(), FsError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to create directory");
        FsError::io(path, &e)
    })?;
    debug!(path = %path.display(), ?mode, recursive, "created directory");
    Ok(())
}

/// Remove an empty directory
///
/// Succeeds only when the directory is gone afterwards.
///
/// # Errors
/// Returns `FsError` if removal fails or the path still exists
pub fn remove_dir(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    fs::remove_dir(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to remove directory");
        FsError::io(path, &e)
    })?;

    if path.exists() {
        return Err(FsError::StillExists(path.to_path_buf()));
    }
    Ok(())
}

/// Delete everything inside `dir`, keeping `dir` itself
///
/// Entries are removed in name order. The first entry that cannot be
/// removed stops the cleanup; entries already removed stay removed.
/// Returns the number of entries removed.
///
/// # Errors
/// Returns `FsError::CleanupAborted` naming the failing entry
#[instrument]
pub fn cleanup_dir(dir: &Path) -> Result<usize, FsError> {
    cleanup_dir_with(dir, remove_entry)
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn cleanup_dir_with<F>(dir: &Path, mut remove: F) -> Result<usize, FsError>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut removed = 0;
    for name in list_dir(dir)? {
        let path = dir.join(&name);
        if let Err(e) = remove(&path) {
            warn!(path = %path.display(), error = %e, removed, "cleanup aborted");
            return Err(FsError::CleanupAborted {
                path,
                removed,
                message: e.to_string(),
            });
        }
        removed += 1;
    }
    debug!(path = %dir.display(), removed, "directory cleaned");
    Ok(removed)
}
