//! Error types for testbed-exec

use std::time::Duration;

use thiserror::Error;

/// Coarse classification shared by every testbed error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The command ran (or tried to) and reported failure
    Execution,
    /// A file, directory, package or executable does not exist
    NotFound,
    /// The target of a create operation is already present
    AlreadyExists,
    /// The OS or remote host refused access
    PermissionDenied,
    /// A deadline elapsed
    Timeout,
    /// Network or session level failure
    Connection,
    /// The caller passed something unusable
    InvalidInput,
}

/// Errors that can occur during local or remote execution
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Nothing to run
    #[error("missing required parameter: command is empty")]
    EmptyCommand,

    /// The shell could not resolve the executable
    #[error("command not found: {stderr}")]
    CommandNotFound {
        /// Captured stderr
        stderr: String,
    },

    /// Command reported failure through its exit status or error stream
    #[error("command execution failed: {status} - {message}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output, or stdout when stderr was empty
        message: String,
    },

    /// Failed to connect to remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server presented a host key that could not be verified
    #[error("host key rejected for {0}")]
    HostKeyRejected(String),

    /// Command or connect phase timed out
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Credential could not be loaded
    #[error("credential error: {0}")]
    CredentialError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),
}

impl ExecError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::EmptyCommand | ExecError::CredentialError(_) => ErrorKind::InvalidInput,
            ExecError::CommandNotFound { .. } => ErrorKind::NotFound,
            ExecError::CommandFailed { .. } | ExecError::SpawnError(_) | ExecError::IoError(_) => {
                ErrorKind::Execution
            }
            ExecError::ConnectionFailed(_) => ErrorKind::Connection,
            ExecError::AuthenticationFailed(_) | ExecError::HostKeyRejected(_) => {
                ErrorKind::PermissionDenied
            }
            ExecError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectionFailed(_) | ExecError::Timeout { .. }
        )
    }

    /// Text the failing command wrote, if any
    #[must_use]
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ExecError::CommandNotFound { stderr } => Some(stderr),
            ExecError::CommandFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}
