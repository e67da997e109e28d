//! testbed-exec: Command execution for test harnesses
//!
//! Runs shell command strings on the local machine or on a remote host over a
//! one-shot SSH session, and classifies the outcome.

pub mod commands;
pub mod credential;
pub mod error;
pub mod local;
pub mod result;
pub mod ssh;
pub mod target;
pub mod traits;

pub use commands::CommandTemplates;
pub use credential::Credential;
pub use error::{ErrorKind, ExecError};
pub use local::{LocalExecutor, run_local_cmd};
pub use result::{CommandOutput, CommandResult, ReadMode, validate_output};
pub use ssh::{SshExecutor, run_remote_cmd};
pub use target::{HostKeyPolicy, RemoteTarget, Target, execute_cmd};
pub use traits::CommandExecutor;
