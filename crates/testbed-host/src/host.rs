//! Reachability and process probes on the local machine

use testbed_exec::commands::fill;
use testbed_exec::{CommandExecutor, CommandTemplates, ExecError, LocalExecutor};
use tracing::{debug, instrument};

use crate::error::PackageError;

/// Local ping and pgrep
#[derive(Debug, Clone, Default)]
pub struct HostProbe {
    templates: CommandTemplates,
    executor: LocalExecutor,
}

impl HostProbe {
    #[must_use]
    pub fn new(templates: CommandTemplates) -> Self {
        Self {
            templates,
            executor: LocalExecutor::new(),
        }
    }

    /// Send one echo request to `host`; true iff ping exits 0
    ///
    /// # Errors
    /// Returns `PackageError::Exec` only if ping cannot be started
    #[instrument(skip(self))]
    pub async fn check_ping(&self, host: &str) -> Result<bool, PackageError> {
        if host.trim().is_empty() {
            return Err(PackageError::InvalidArgument("empty host".into()));
        }
        let cmd = fill(&self.templates.ping, &[("host", host)]);
        let result = self.executor.capture(&cmd).await?;
        debug!(host = %host, status = result.status, "ping finished");
        Ok(result.success())
    }

    /// Whether `dir` lists an entry named exactly `utility`
    ///
    /// A directory that cannot be listed has no utilities.
    ///
    /// # Errors
    /// Returns `PackageError::Exec` if the listing cannot be run at all
    #[instrument(skip(self))]
    pub async fn is_utility_present(&self, utility: &str, dir: &str) -> Result<bool, PackageError> {
        let entries = list_entries(&self.executor, &self.templates, dir).await?;
        Ok(entries.iter().any(|entry| entry == utility))
    }

    /// Raw output of the process-grep command for `process`
    ///
    /// # Errors
    /// Returns `PackageError::Exec` if the command reports an error
    #[instrument(skip(self))]
    pub async fn pgrep(&self, process: &str) -> Result<Vec<u8>, PackageError> {
        let cmd = fill(&self.templates.pgrep, &[("process", process)]);
        Ok(self.executor.run(&cmd).await?.into_bytes())
    }
}

/// Entries of `path` through the directory-listing template
///
/// A listing that fails with error output (missing path, no `ls`) is empty.
pub(crate) async fn list_entries(
    executor: &dyn CommandExecutor,
    templates: &CommandTemplates,
    path: &str,
) -> Result<Vec<String>, PackageError> {
    let cmd = fill(&templates.list_dir, &[("path", path)]);
    match executor.run(&cmd).await {
        Ok(output) => Ok(output.lines().unwrap_or_default()),
        Err(ExecError::CommandFailed { .. } | ExecError::CommandNotFound { .. }) => {
            debug!(path = %path, "nothing listed");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}
