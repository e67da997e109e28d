//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use testbed_exec::CommandTemplates;

/// Top-level configuration for the testbed CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
    /// Defaults for SSH targets
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Command template overrides
    #[serde(default)]
    pub commands: CommandTemplates,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Defaults for SSH targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Skip host key verification (disposable lab machines only)
    #[serde(default)]
    pub accept_unknown_host_keys: bool,
    /// known_hosts file to verify against instead of `~/.ssh/known_hosts`
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
            accept_unknown_host_keys: false,
            known_hosts: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `TESTBED_CONFIG`, the usual paths, or fall back to defaults
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be parsed
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("TESTBED_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let paths = [
            Some(PathBuf::from("testbed.toml")),
            Some(PathBuf::from("/etc/testbed/testbed.toml")),
            dirs::config_dir().map(|p| p.join("testbed/testbed.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.log.level, "info");
        assert_eq!(config.remote.port, 22);
        assert_eq!(config.remote.connect_timeout_secs, 30);
        assert!(!config.remote.accept_unknown_host_keys);
        assert_eq!(config.commands, CommandTemplates::default());
    }

    #[test]
    fn test_load_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("testbed.toml");
        std::fs::write(
            &path,
            r#"
[log]
level = "debug"
json = true

[remote]
connect_timeout_secs = 5
accept_unknown_host_keys = true

[commands]
rpm_install = "dnf install -y {package}"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
        assert_eq!(config.remote.connect_timeout_secs, 5);
        assert!(config.remote.accept_unknown_host_keys);
        assert_eq!(config.commands.rpm_install, "dnf install -y {package}");
        assert_eq!(config.commands.rpm_list, "rpm -qa");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/definitely/not/testbed.toml")).is_err());
    }
}
