//! Error types for testbed-fs

use std::io;
use std::path::PathBuf;

use testbed_exec::{ErrorKind, ExecError};
use thiserror::Error;

/// Errors that can occur during filesystem and file content operations
#[derive(Error, Debug, Clone)]
pub enum FsError {
    /// Path does not exist
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// Path already exists
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    /// OS refused access
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other OS error
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// OS error text
        message: String,
    },

    /// Directory was removed but is still present
    #[error("directory still exists after removal: {0}")]
    StillExists(PathBuf),

    /// Directory cleanup stopped at the first entry it could not delete
    #[error("cleanup aborted at {path} after removing {removed} entries: {message}")]
    CleanupAborted {
        /// Entry that could not be deleted
        path: PathBuf,
        /// Entries deleted before the failure (not restored)
        removed: usize,
        /// OS error text
        message: String,
    },

    /// Caller passed an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Helper command failed
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl FsError {
    /// Map an `io::Error` on `path` to the matching variant
    pub fn io(path: impl Into<PathBuf>, err: &io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path),
            _ => FsError::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            FsError::Io { .. } | FsError::StillExists(_) | FsError::CleanupAborted { .. } => {
                ErrorKind::Execution
            }
            FsError::InvalidArgument(_) => ErrorKind::InvalidInput,
            FsError::Exec(e) => e.kind(),
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            FsError::Exec(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_mapping() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(FsError::io("/x", &err), FsError::NotFound(_)));

        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(FsError::io("/x", &err).kind(), ErrorKind::PermissionDenied);

        let err = io::Error::other("weird");
        assert!(matches!(FsError::io("/x", &err), FsError::Io { .. }));
    }

    #[test]
    fn test_exec_kind_passthrough() {
        let err = FsError::from(ExecError::EmptyCommand);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
