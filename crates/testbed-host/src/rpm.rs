//! RPM package queries (RHEL/CentOS/Rocky)

use std::sync::Arc;

use testbed_exec::commands::fill;
use testbed_exec::{CommandExecutor, CommandOutput, CommandTemplates, ExecError};
use tracing::{debug, info, instrument};

use crate::error::PackageError;
use crate::host::list_entries;
use crate::types::{MachineState, RpmListing, RpmPresence};

/// RPM queries against a local or remote host
pub struct RpmManager {
    /// Executor for running rpm/yum commands
    executor: Arc<dyn CommandExecutor>,
    templates: CommandTemplates,
}

impl RpmManager {
    /// Create a new RPM manager
    ///
    /// # Arguments
    /// * `executor` - Where the rpm commands run
    /// * `templates` - Command strings for list, grep and install
    pub fn new(executor: Arc<dyn CommandExecutor>, templates: CommandTemplates) -> Self {
        Self {
            executor,
            templates,
        }
    }

    /// Check whether a package whose name contains `expected` is installed
    ///
    /// A list command that writes to its error stream counts as "not found"
    /// rather than a failure.
    ///
    /// # Errors
    /// Returns `PackageError::Exec` for connection, auth or timeout failures
    #[instrument(skip(self))]
    pub async fn is_installed(&self, expected: &str) -> Result<RpmPresence, PackageError> {
        let cmd = &self.templates.rpm_list;
        debug!(command = %cmd, "listing installed packages");

        let output = match self.executor.run(cmd).await {
            Ok(output) => output,
            Err(ExecError::CommandFailed { .. } | ExecError::CommandNotFound { .. }) => {
                debug!("RPM not found");
                return Ok(RpmPresence::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let installed = output.lines().unwrap_or_default();
        debug!(count = installed.len(), "installed packages");

        let presence = RpmPresence::from_installed(&installed, expected);
        if presence.installed {
            debug!(rpm = %expected, "RPM already installed");
        }
        Ok(presence)
    }

    /// Install `package` (a name, path or URL) with the install template
    ///
    /// # Errors
    /// Returns whatever the executor reports for the install command
    #[instrument(skip(self))]
    pub async fn install(&self, package: &str) -> Result<CommandOutput, PackageError> {
        if package.trim().is_empty() {
            return Err(PackageError::InvalidArgument("empty package".into()));
        }

        let cmd = fill(&self.templates.rpm_install, &[("package", package)]);
        info!(command = %cmd, "installing package");
        let output = self.executor.run(&cmd).await?;
        info!(package = %package, "installed package");
        Ok(output)
    }

    /// List installed packages whose names match `filter`
    ///
    /// A blank filter lists every installed package. grep exiting 1 without
    /// output means "no match" and yields an empty listing.
    ///
    /// # Errors
    /// Returns `PackageError::Exec` for any other execution failure
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &str) -> Result<RpmListing, PackageError> {
        let cmd = if filter.trim().is_empty() {
            self.templates.rpm_list.clone()
        } else {
            fill(&self.templates.rpm_grep, &[("filter", filter)])
        };
        debug!(command = %cmd, "listing packages");

        let output = match self.executor.run(&cmd).await {
            Ok(output) => output,
            Err(ExecError::CommandFailed { status: 1, message }) if message.trim().is_empty() => {
                return Ok(RpmListing::Packages(Vec::new()));
            }
            Err(e) => return Err(e.into()),
        };

        let listing = match output.lines() {
            Some(lines) => RpmListing::Packages(lines),
            None => RpmListing::Raw(output.into_bytes()),
        };
        debug!(found = listing.found(), "package listing");
        Ok(listing)
    }

    /// Check for packages matching `rpm_filter` and entries under `provisioner_dir`
    ///
    /// # Errors
    /// Returns `PackageError::Exec` for connection, auth or timeout failures
    #[instrument(skip(self))]
    pub async fn machine_state(
        &self,
        rpm_filter: &str,
        provisioner_dir: &str,
    ) -> Result<MachineState, PackageError> {
        let rpm_installed = self.list(rpm_filter).await?.found();
        let provisioner_present =
            !list_entries(self.executor.as_ref(), &self.templates, provisioner_dir)
                .await?
                .is_empty();

        let state = MachineState {
            rpm_installed,
            provisioner_present,
        };
        debug!(?state, "machine state");
        Ok(state)
    }

    /// Whether `rpm` exists on the target
    pub async fn is_available(&self) -> bool {
        self.executor.run("which rpm").await.is_ok_and(|out| !out.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    struct ScriptedExecutor {
        reply: Result<CommandOutput, ExecError>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(reply: Result<CommandOutput, ExecError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn run(&self, cmd: &str) -> Result<CommandOutput, ExecError> {
            self.seen.lock().unwrap().push(cmd.to_string());
            self.reply.clone()
        }

        async fn run_with_timeout(
            &self,
            cmd: &str,
            _timeout: Duration,
        ) -> Result<CommandOutput, ExecError> {
            self.run(cmd).await
        }

        fn executor_type(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_list_builds_grep_command() {
        let exec = ScriptedExecutor::new(Ok(CommandOutput::Lines(vec![
            " cortx-s3server-2.0 ".into(),
        ])));
        let rpm = RpmManager::new(exec.clone(), CommandTemplates::default());

        let listing = rpm.list("cortx").await.unwrap();

        assert_eq!(listing, RpmListing::Packages(vec!["cortx-s3server-2.0".into()]));
        assert_eq!(exec.seen.lock().unwrap()[0], "rpm -qa | grep cortx");
    }

    #[tokio::test]
    async fn test_list_blank_filter_lists_everything() {
        let exec = ScriptedExecutor::new(Ok(CommandOutput::Bytes(b"foo-1.2\nbar-2.0\n".to_vec())));
        let rpm = RpmManager::new(exec.clone(), CommandTemplates::default());

        let listing = rpm.list(" ").await.unwrap();

        assert_eq!(
            listing,
            RpmListing::Packages(vec!["foo-1.2".into(), "bar-2.0".into()])
        );
        assert_eq!(exec.seen.lock().unwrap()[0], "rpm -qa");
    }

    #[tokio::test]
    async fn test_list_binary_output_is_raw() {
        let exec = ScriptedExecutor::new(Ok(CommandOutput::Bytes(vec![0xff, 0x00, 0xfe])));
        let rpm = RpmManager::new(exec, CommandTemplates::default());

        let listing = rpm.list("x").await.unwrap();

        assert!(!listing.found());
        assert_eq!(listing, RpmListing::Raw(vec![0xff, 0x00, 0xfe]));
    }

    #[tokio::test]
    async fn test_list_grep_no_match() {
        let exec = ScriptedExecutor::new(Err(ExecError::CommandFailed {
            status: 1,
            message: String::new(),
        }));
        let rpm = RpmManager::new(exec, CommandTemplates::default());

        let listing = rpm.list("nothing").await.unwrap();

        assert_eq!(listing, RpmListing::Packages(Vec::new()));
    }

    #[tokio::test]
    async fn test_install_rejects_empty() {
        let exec = ScriptedExecutor::new(Ok(CommandOutput::Bytes(Vec::new())));
        let rpm = RpmManager::new(exec.clone(), CommandTemplates::default());

        assert!(matches!(
            rpm.install("  ").await,
            Err(PackageError::InvalidArgument(_))
        ));
        assert!(exec.seen.lock().unwrap().is_empty());
    }
}
