use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use testbed_exec::{CommandExecutor, CommandOutput, CommandTemplates, ErrorKind, ExecError, Target};
use testbed_host::types::RPM_NOT_FOUND_MSG;
use testbed_host::{MachineState, PackageError, RpmListing, RpmManager};

// Mock implementations
struct MockExecutor {
    installed: Vec<String>,
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(&self, _cmd: &str) -> Result<CommandOutput, ExecError> {
        Ok(CommandOutput::Lines(self.installed.clone()))
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        self.run(cmd).await
    }

    fn executor_type(&self) -> &'static str {
        "mock"
    }
}

struct FailingExecutor {
    error: ExecError,
}

#[async_trait]
impl CommandExecutor for FailingExecutor {
    async fn run(&self, _cmd: &str) -> Result<CommandOutput, ExecError> {
        Err(self.error.clone())
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        self.run(cmd).await
    }

    fn executor_type(&self) -> &'static str {
        "failing"
    }
}

fn manager(executor: impl CommandExecutor + 'static) -> RpmManager {
    RpmManager::new(Arc::new(executor), CommandTemplates::default())
}

#[tokio::test]
async fn test_installed_substring_match() {
    let rpm = manager(MockExecutor {
        installed: vec!["foo-1.2-rpm".to_string()],
    });

    let presence = rpm.is_installed("foo").await.unwrap();

    assert!(presence.installed);
}

#[tokio::test]
async fn test_empty_installed_list() {
    let rpm = manager(MockExecutor { installed: vec![] });

    let presence = rpm.is_installed("foo").await.unwrap();

    assert!(!presence.installed);
    assert_eq!(presence.message, RPM_NOT_FOUND_MSG);
}

#[tokio::test]
async fn test_error_stream_means_not_found() {
    let rpm = manager(FailingExecutor {
        error: ExecError::CommandFailed {
            status: 0,
            message: "error: rpmdb open failed".to_string(),
        },
    });

    let presence = rpm.is_installed("foo").await.unwrap();

    assert!(!presence.installed);
    assert_eq!(presence.message, RPM_NOT_FOUND_MSG);
}

#[tokio::test]
async fn test_connection_failure_propagates() {
    let rpm = manager(FailingExecutor {
        error: ExecError::Timeout {
            timeout: Duration::from_secs(30),
        },
    });

    let err = rpm.is_installed("foo").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_install_returns_executor_output() {
    let rpm = manager(MockExecutor {
        installed: vec!["Complete!".to_string()],
    });

    let output = rpm.install("https://repo.example/pkg.rpm").await.unwrap();

    assert_eq!(output, CommandOutput::Lines(vec!["Complete!".to_string()]));
}

#[tokio::test]
async fn test_install_failure_propagates() {
    let rpm = manager(FailingExecutor {
        error: ExecError::CommandFailed {
            status: 1,
            message: "No package pkg available.".to_string(),
        },
    });

    let result = rpm.install("pkg").await;

    assert!(matches!(result, Err(PackageError::Exec(_))));
}

#[tokio::test]
async fn test_local_target_dispatch() {
    let templates = CommandTemplates {
        rpm_list: "printf 'foo-1.2-rpm\\nbar-2.0\\n'".to_string(),
        rpm_grep: "printf 'foo-1.2-rpm\\nbar-2.0\\n' | grep {filter}".to_string(),
        ..CommandTemplates::default()
    };
    let rpm = RpmManager::new(Arc::new(Target::Local), templates);

    assert!(rpm.is_installed("bar").await.unwrap().installed);
    assert!(!rpm.is_installed("baz").await.unwrap().installed);

    let listing = rpm.list("foo").await.unwrap();
    assert!(listing.found());
    assert_eq!(listing, RpmListing::Packages(vec!["foo-1.2-rpm".to_string()]));

    let all = rpm.list("").await.unwrap();
    assert_eq!(all.packages(), ["foo-1.2-rpm", "bar-2.0"]);

    // grep without a match exits 1 silently, which local execution accepts
    let empty = rpm.list("nothing-here").await.unwrap();
    assert!(!empty.found());
}

#[tokio::test]
async fn test_machine_state_on_local_target() {
    let tmp = tempfile::tempdir().unwrap();
    let prov = tmp.path().join("prvsnr");
    std::fs::create_dir(&prov).unwrap();
    let prov = prov.to_str().unwrap();

    let templates = CommandTemplates {
        rpm_grep: "printf 'eos-prvsnr-1.0\\n' | grep {filter}".to_string(),
        ..CommandTemplates::default()
    };
    let rpm = RpmManager::new(Arc::new(Target::Local), templates);

    let state = rpm.machine_state("eos-prvsnr", prov).await.unwrap();
    assert_eq!(
        state,
        MachineState {
            rpm_installed: true,
            provisioner_present: false,
        }
    );

    std::fs::write(tmp.path().join("prvsnr").join("cli"), b"").unwrap();
    let state = rpm.machine_state("cortx", "/definitely/not/here").await.unwrap();
    assert!(state.is_clean());

    let state = rpm.machine_state("cortx", prov).await.unwrap();
    assert!(state.provisioner_present);
    assert!(!state.is_clean());
}
