//! Local command execution using `tokio::process`

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::{CommandOutput, CommandResult};
use crate::traits::CommandExecutor;

/// Printed by `ssh-copy-id`; stderr chatter alongside it is not a failure
const KEY_ADDED_MARKER: &[u8] = b"Number of key(s) added: 1";

/// stderr fragments meaning the shell could not find the executable
const NOT_FOUND_MARKERS: [&[u8]; 2] = [
    b"command not found",
    b"not recognized as an internal or external command",
];

/// Local command executor
///
/// Runs command strings through the platform shell so pipes, globs and
/// redirections behave as typed.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn shell(cmd: &str) -> Command {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C");
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c");
            c
        };
        command
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Run `cmd` and return the raw capture without classifying it
    ///
    /// # Errors
    /// Returns `ExecError::EmptyCommand` for a blank command, or a spawn/I/O error
    #[instrument(skip(self), level = "debug")]
    pub async fn capture(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        if cmd.trim().is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let start = Instant::now();
        debug!(command = %cmd, "executing local command");

        let child = Self::shell(cmd)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
            duration: start.elapsed(),
        };

        debug!(
            command = %cmd,
            status = result.status,
            duration = ?result.duration,
            stdout = %result.stdout_lossy(),
            stderr = %result.stderr_lossy(),
            "command completed"
        );

        Ok(result)
    }

    /// Decide whether a finished local command succeeded
    ///
    /// Local commands are judged by their error stream, not their exit
    /// status: anything on stderr is a failure unless stdout carries the
    /// key-installation confirmation.
    ///
    /// # Errors
    /// Returns `ExecError::CommandNotFound` or `ExecError::CommandFailed`
    pub fn classify(result: CommandResult) -> Result<CommandOutput, ExecError> {
        if contains(&result.stdout, KEY_ADDED_MARKER) {
            return Ok(CommandOutput::Bytes(result.stdout));
        }

        if NOT_FOUND_MARKERS.iter().any(|m| contains(&result.stderr, m)) {
            return Err(ExecError::CommandNotFound {
                stderr: result.stderr_lossy().into_owned(),
            });
        }

        if !result.stderr.is_empty() {
            return Err(ExecError::CommandFailed {
                status: result.status,
                message: result.stderr_lossy().into_owned(),
            });
        }

        Ok(CommandOutput::Bytes(result.stdout))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Run `cmd` on the local machine
///
/// # Errors
/// See [`LocalExecutor::classify`]
pub async fn run_local_cmd(cmd: &str) -> Result<CommandOutput, ExecError> {
    LocalExecutor::new().run(cmd).await
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn run(&self, cmd: &str) -> Result<CommandOutput, ExecError> {
        let result = self.capture(cmd).await?;
        Self::classify(result).inspect_err(|e| {
            error!(command = %cmd, error = %e, "local command failed");
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandOutput, ExecError> {
        let start = Instant::now();

        debug!(command = %cmd, timeout = ?timeout_duration, "executing with timeout");

        match timeout(timeout_duration, self.run(cmd)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    command = %cmd,
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "command timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}
