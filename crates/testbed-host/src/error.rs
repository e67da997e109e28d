//! Error types for testbed-host

use testbed_exec::{ErrorKind, ExecError};
use thiserror::Error;

/// Errors that can occur during host and package queries
#[derive(Error, Debug, Clone)]
pub enum PackageError {
    /// rpm is not installed on the target
    #[error("package manager not found: {0}")]
    ManagerNotFound(String),

    /// Caller passed an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Execution error from the command executor
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl PackageError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackageError::ManagerNotFound(_) => ErrorKind::NotFound,
            PackageError::InvalidArgument(_) => ErrorKind::InvalidInput,
            PackageError::Exec(e) => e.kind(),
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, PackageError::Exec(e) if e.is_retryable())
    }
}
