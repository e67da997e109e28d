//! Where a command runs: the local machine or a remote host

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::ExecError;
use crate::local::LocalExecutor;
use crate::result::{CommandOutput, ReadMode};
use crate::ssh::SshExecutor;
use crate::traits::CommandExecutor;

/// Default SSH connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the server's host key is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Verify against a known_hosts file (`~/.ssh/known_hosts` when `None`)
    KnownHosts(Option<PathBuf>),
    /// Accept every key. Only for disposable test machines.
    AcceptAny,
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        HostKeyPolicy::KnownHosts(None)
    }
}

impl HostKeyPolicy {
    /// Pick the policy from a config/CLI opt-in flag
    #[must_use]
    pub fn from_opt_in(accept_unknown: bool, known_hosts: Option<PathBuf>) -> Self {
        if accept_unknown {
            HostKeyPolicy::AcceptAny
        } else {
            HostKeyPolicy::KnownHosts(known_hosts)
        }
    }
}

/// Everything needed to run one command on a remote host
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    /// Host address
    pub host: String,
    /// Port (default 22)
    pub port: u16,
    /// Username
    pub user: String,
    /// How to authenticate
    pub credential: Credential,
    /// Limit on connect + authenticate
    pub connect_timeout: Duration,
    /// How output is read back
    pub read_mode: ReadMode,
    /// Host key verification
    pub host_key_policy: HostKeyPolicy,
}

impl RemoteTarget {
    /// Password-authenticated target with default port, timeout and read mode
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_credential(host, user, Credential::Password(password.into()))
    }

    pub fn with_credential(
        host: impl Into<String>,
        user: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            credential,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_mode: ReadMode::default(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Read output as trimmed lines
    #[must_use]
    pub fn read_lines(mut self) -> Self {
        self.read_mode = ReadMode::Lines;
        self
    }

    /// Read raw output, keeping at most `limit` bytes (`None` = all)
    #[must_use]
    pub fn read_bytes(mut self, limit: Option<usize>) -> Self {
        self.read_mode = ReadMode::Raw { limit };
        self
    }

    #[must_use]
    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }
}

/// Execution target selected per call
#[derive(Debug, Clone)]
pub enum Target {
    Local,
    Remote(RemoteTarget),
}

impl Target {
    /// Select the target from a `remote` flag
    ///
    /// The remote parameters are only consulted when `remote` is true.
    ///
    /// # Errors
    /// Returns `ExecError::CredentialError` if `remote` is set without a target
    pub fn select(remote: bool, remote_target: Option<RemoteTarget>) -> Result<Self, ExecError> {
        if !remote {
            return Ok(Target::Local);
        }
        remote_target.map(Target::Remote).ok_or_else(|| {
            ExecError::CredentialError("remote execution requested without host details".into())
        })
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Target::Remote(_))
    }
}

/// Run `cmd` locally or remotely depending on `target`
///
/// # Errors
/// Propagates the local or remote execution error unchanged
pub async fn execute_cmd(cmd: &str, target: &Target) -> Result<CommandOutput, ExecError> {
    target.run(cmd).await
}

#[async_trait]
impl CommandExecutor for Target {
    async fn run(&self, cmd: &str) -> Result<CommandOutput, ExecError> {
        match self {
            Target::Local => LocalExecutor::new().run(cmd).await,
            Target::Remote(remote) => SshExecutor::new(remote.clone()).run(cmd).await,
        }
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        match self {
            Target::Local => LocalExecutor::new().run_with_timeout(cmd, timeout).await,
            Target::Remote(remote) => {
                SshExecutor::new(remote.clone())
                    .run_with_timeout(cmd, timeout)
                    .await
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        match self {
            Target::Local => "local",
            Target::Remote(_) => "ssh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let target = RemoteTarget::new("node-1", "root", "secret");

        assert_eq!(target.port, 22);
        assert_eq!(target.connect_timeout, Duration::from_secs(30));
        assert_eq!(target.read_mode, ReadMode::Raw { limit: None });
        assert_eq!(target.host_key_policy, HostKeyPolicy::KnownHosts(None));
    }

    #[test]
    fn test_select_local_ignores_remote_args() {
        let target = Target::select(false, Some(RemoteTarget::new("h", "u", "p"))).unwrap();

        assert!(!target.is_remote());
    }

    #[test]
    fn test_select_remote_requires_target() {
        assert!(Target::select(true, None).is_err());
        assert!(
            Target::select(true, Some(RemoteTarget::new("h", "u", "p")))
                .unwrap()
                .is_remote()
        );
    }

    #[test]
    fn test_host_key_opt_in() {
        assert_eq!(
            HostKeyPolicy::from_opt_in(true, None),
            HostKeyPolicy::AcceptAny
        );
        assert_eq!(
            HostKeyPolicy::from_opt_in(false, Some(PathBuf::from("/tmp/kh"))),
            HostKeyPolicy::KnownHosts(Some(PathBuf::from("/tmp/kh")))
        );
    }

    #[tokio::test]
    async fn test_execute_local() {
        let output = execute_cmd("echo dispatched", &Target::Local).await.unwrap();

        assert_eq!(output.to_text().trim(), "dispatched");
    }
}
