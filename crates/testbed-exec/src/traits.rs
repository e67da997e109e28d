//! Command executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandOutput;

/// Something that can run a shell command string and classify the outcome
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `cmd` to completion
    ///
    /// # Errors
    /// Returns `ExecError` when the command cannot be started or reports failure
    async fn run(&self, cmd: &str) -> Result<CommandOutput, ExecError>;

    /// Run `cmd`, giving up after `timeout`
    ///
    /// # Errors
    /// Returns `ExecError::Timeout` when the deadline passes, otherwise as [`run`](Self::run)
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError>;

    /// Short label used in logs
    fn executor_type(&self) -> &'static str;
}
