//! SSH command execution using russh crate
//!
//! Every call opens its own session, runs exactly one command and tears the
//! session down again. Sessions are never pooled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::keys::{PrivateKeyWithHashAlg, check_known_hosts, check_known_hosts_path, ssh_key};
use russh::{ChannelMsg, Disconnect, client};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::credential::AuthMethod;
use crate::error::ExecError;
use crate::result::{CommandOutput, CommandResult, ReadMode, split_lines};
use crate::target::{HostKeyPolicy, RemoteTarget};
use crate::traits::CommandExecutor;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        let verified = match &self.policy {
            HostKeyPolicy::AcceptAny => {
                warn!(host = %self.host, "accepting unverified host key");
                return Ok(true);
            }
            HostKeyPolicy::KnownHosts(None) => {
                check_known_hosts(&self.host, self.port, server_public_key)
            }
            HostKeyPolicy::KnownHosts(Some(path)) => {
                check_known_hosts_path(&self.host, self.port, server_public_key, path)
            }
        };

        match verified {
            Ok(true) => Ok(true),
            Ok(false) => {
                error!(host = %self.host, "host key not present in known_hosts");
                Ok(false)
            }
            Err(e) => {
                error!(host = %self.host, error = %e, "host key verification failed");
                Ok(false)
            }
        }
    }
}

/// SSH command executor
///
/// Holds the target description only; a fresh session is built for every
/// command.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    target: RemoteTarget,
}

impl SshExecutor {
    /// Create a new SSH executor
    #[must_use]
    pub fn new(target: RemoteTarget) -> Self {
        Self { target }
    }

    /// Get the remote target
    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// Connect and authenticate, bounded by the target's connect timeout
    #[instrument(skip(self), fields(host = %self.target.host))]
    async fn connect(&self) -> Result<client::Handle<SshClientHandler>, ExecError> {
        let limit = self.target.connect_timeout;
        match timeout(limit, self.connect_inner()).await {
            Ok(result) => result,
            Err(_) => {
                error!(host = %self.target.host, timeout = ?limit, "SSH connect timed out");
                Err(ExecError::Timeout { timeout: limit })
            }
        }
    }

    async fn connect_inner(&self) -> Result<client::Handle<SshClientHandler>, ExecError> {
        let target = &self.target;

        info!(
            host = %target.host,
            port = target.port,
            user = %target.user,
            "connecting to SSH"
        );

        let auth = target
            .credential
            .resolve()
            .map_err(|e| ExecError::CredentialError(e.to_string()))?;

        let config = Arc::new(client::Config::default());
        let handler = SshClientHandler {
            host: target.host.clone(),
            port: target.port,
            policy: target.host_key_policy.clone(),
        };

        let mut session = client::connect(config, (&target.host[..], target.port), handler)
            .await
            .map_err(|e| match e {
                russh::Error::UnknownKey => ExecError::HostKeyRejected(target.host.clone()),
                other => ExecError::ConnectionFailed(other.to_string()),
            })?;

        let auth_res = match auth {
            AuthMethod::Password(password) => session
                .authenticate_password(&target.user, password)
                .await
                .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?,
            AuthMethod::Key(key) => {
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                session
                    .authenticate_publickey(
                        &target.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?
            }
        };

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(format!(
                "server rejected credentials for {}",
                target.user
            )));
        }

        info!(host = %target.host, "SSH connected and authenticated");
        Ok(session)
    }

    /// Run one command on an open session and collect everything it sends
    async fn exec(
        session: &mut client::Handle<SshClientHandler>,
        cmd: &str,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = -1;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // exit-status can arrive after EOF, so drain until the channel closes
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => status = exit_status.cast_signed(),
                _ => {}
            }
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }

    /// Connect, run `cmd`, disconnect
    async fn round_trip(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        if cmd.trim().is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let mut session = self.connect().await?;

        debug!(command = %cmd, "executing remote command");
        let result = Self::exec(&mut session, cmd).await;

        if let Err(e) = session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            warn!(host = %self.target.host, error = %e, "SSH disconnect failed");
        } else {
            debug!(host = %self.target.host, "SSH disconnected");
        }

        let result = result?;
        debug!(
            command = %cmd,
            status = result.status,
            duration = ?result.duration,
            "remote command completed"
        );
        Ok(result)
    }

    /// Turn a raw remote capture into output according to `read_mode`
    ///
    /// A non-zero exit fails with stderr, or stdout when stderr is empty.
    /// Error output also fails a command that exited 0.
    ///
    /// # Errors
    /// Returns `ExecError::CommandFailed`
    pub fn classify(result: CommandResult, read_mode: ReadMode) -> Result<CommandOutput, ExecError> {
        let (output, error) = match read_mode {
            ReadMode::Lines => {
                let out = split_lines(&result.stdout_lossy());
                let err = split_lines(&result.stderr_lossy());
                (CommandOutput::Lines(out), err.join("\n"))
            }
            ReadMode::Raw { limit } => {
                let mut out = result.stdout.clone();
                if let Some(limit) = limit {
                    out.truncate(limit);
                }
                (
                    CommandOutput::Bytes(out),
                    result.stderr_lossy().into_owned(),
                )
            }
        };

        if result.status != 0 {
            let message = if error.is_empty() {
                output.to_text()
            } else {
                error
            };
            return Err(ExecError::CommandFailed {
                status: result.status,
                message,
            });
        }

        if !error.is_empty() {
            return Err(ExecError::CommandFailed {
                status: result.status,
                message: error,
            });
        }

        Ok(output)
    }
}

/// Run `cmd` on `target` over a fresh SSH session
///
/// # Errors
/// Returns connection, authentication, timeout or command errors
pub async fn run_remote_cmd(cmd: &str, target: &RemoteTarget) -> Result<CommandOutput, ExecError> {
    SshExecutor::new(target.clone()).run(cmd).await
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    #[instrument(skip(self), fields(host = %self.target.host))]
    async fn run(&self, cmd: &str) -> Result<CommandOutput, ExecError> {
        let result = self.round_trip(cmd).await?;
        Self::classify(result, self.target.read_mode).inspect_err(|e| {
            error!(command = %cmd, error = %e, "remote command failed");
        })
    }

    #[instrument(skip(self), fields(host = %self.target.host))]
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
        "ssh"
    }
}
