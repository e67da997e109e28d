//! Single-file helpers

use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::error::FsError;

/// Create (or truncate) `path` as an empty file
///
/// Returns whether the file exists afterwards.
///
/// # Errors
/// Returns `FsError` if the file cannot be created
pub fn open_empty_file(path: impl AsRef<Path>) -> Result<bool, FsError> {
    let path = path.as_ref();
    fs::File::create(path).map_err(|e| FsError::io(path, &e))?;
    Ok(path.exists())
}

/// Create a symlink at `link` pointing to `target`
///
/// # Errors
/// Returns `FsError` if the link cannot be created
pub fn create_symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<(), FsError> {
    let (target, link) = (target.as_ref(), link.as_ref());

    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_file(target, link);

    result.map_err(|e| {
        error!(
            target = %target.display(),
            link = %link.display(),
            error = %e,
            "failed to create symlink"
        );
        FsError::io(link, &e)
    })?;
    debug!(target = %target.display(), link = %link.display(), "created symlink");
    Ok(())
}

/// Remove a single file
///
/// # Errors
/// Returns `FsError` if the file cannot be removed
pub fn remove_file(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    fs::remove_file(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to remove file");
        FsError::io(path, &e)
    })
}
