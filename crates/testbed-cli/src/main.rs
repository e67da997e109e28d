//! testbed CLI
//!
//! Command-line access to the testbed execution, filesystem and host helpers

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use eyre::{WrapErr, bail, eyre};
use testbed_exec::{Credential, HostKeyPolicy, RemoteTarget, Target, execute_cmd};
use testbed_fs::{
    BackupAction, BlockSource, ChecksumFormat, DigestAlgorithm, FileGenerator, PartSizing,
    SizeRange,
};
use testbed_host::{HostProbe, RpmManager};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Config, LogConfig, RemoteConfig};

#[derive(Parser)]
#[command(name = "testbed", version)]
#[command(about = "Command execution and file utilities for storage test rigs", long_about = None)]
struct Cli {
    /// Config file (defaults to $TESTBED_CONFIG or testbed.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a shell command locally, or remotely with --host
    Run {
        command: String,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Checksum a file with openssl/md5sum
    Checksum {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Md5)]
        algorithm: AlgorithmArg,
        /// Print `<algo>sum` hex output instead of base64 of the binary digest
        #[arg(long)]
        hex: bool,
        /// Extra options for the hex tool
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        options: String,
    },
    /// Checksum a file in-process
    Digest {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Md5)]
        algorithm: AlgorithmArg,
    },
    /// Percent used of the filesystem holding a path
    DiskUsage { path: PathBuf },
    /// Create a file from a block device
    CreateFile {
        path: PathBuf,
        /// Number of blocks
        #[arg(long)]
        count: u64,
        #[arg(long, default_value = "/dev/zero")]
        device: PathBuf,
        #[arg(long, default_value = "1M")]
        block_size: String,
    },
    /// Create several files of random size (MB) in a directory
    CreateFiles {
        dir: PathBuf,
        #[arg(long)]
        min_mb: u64,
        #[arg(long)]
        max_mb: u64,
        #[arg(long)]
        count: usize,
        #[arg(long, default_value = "testfile")]
        prefix: String,
    },
    /// Recreate a file and split it into parts
    Split {
        path: PathBuf,
        #[arg(long)]
        size_mb: u64,
        #[arg(long)]
        parts: usize,
        /// Seeded random part sizes instead of equal parts
        #[arg(long)]
        random: bool,
    },
    /// Delete everything inside a directory
    Cleanup { dir: PathBuf },
    /// Copy files into a backup directory, or back with --restore
    Backup {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        restore: bool,
        files: Vec<PathBuf>,
    },
    /// Send one ping to a host
    Ping { host: String },
    /// Look up a process with pgrep
    Pgrep { process: String },
    /// Check that a directory lists a utility
    Utility { name: String, dir: String },
    /// RPM queries
    Rpm {
        #[command(subcommand)]
        action: RpmAction,
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

#[derive(Subcommand)]
enum RpmAction {
    /// Check that a package matching a name is installed
    Check { name: String },
    /// List installed packages matching a filter
    List {
        #[arg(default_value = "")]
        filter: String,
    },
    /// Install a package
    Install { package: String },
    /// Report leftover packages and provisioner files
    MachineState {
        #[arg(long, default_value = "eos-prvsnr")]
        filter: String,
        #[arg(long, default_value = "/opt/seagate")]
        dir: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Md5,
    Sha256,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Md5 => DigestAlgorithm::Md5,
            AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
        }
    }
}

/// SSH target options; without --host commands run locally
#[derive(Args, Debug, Clone, Default)]
struct RemoteArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long, short)]
    user: Option<String>,
    #[arg(long, env = "TESTBED_SSH_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Private key file, used instead of a password
    #[arg(long)]
    key: Option<PathBuf>,
    #[arg(long)]
    port: Option<u16>,
    /// Read remote output as trimmed lines
    #[arg(long)]
    lines: bool,
    /// Keep at most this many bytes of remote output
    #[arg(long, conflicts_with = "lines")]
    max_bytes: Option<usize>,
    /// Trust host keys without verification (disposable machines only)
    #[arg(long)]
    accept_unknown_host_keys: bool,
}

impl RemoteArgs {
    fn target(&self, defaults: &RemoteConfig) -> Result<Target> {
        let Some(host) = &self.host else {
            return Ok(Target::Local);
        };
        let user = self
            .user
            .clone()
            .ok_or_else(|| eyre!("--user is required with --host"))?;
        let credential = match (&self.key, &self.password) {
            (Some(key), _) => Credential::KeyFile(key.clone()),
            (None, Some(password)) => Credential::Password(password.clone()),
            (None, None) => bail!("--password (or TESTBED_SSH_PASSWORD) or --key is required"),
        };

        let mut remote = RemoteTarget::with_credential(host.clone(), user, credential)
            .with_port(self.port.unwrap_or(defaults.port))
            .with_connect_timeout(Duration::from_secs(defaults.connect_timeout_secs))
            .with_host_key_policy(HostKeyPolicy::from_opt_in(
                self.accept_unknown_host_keys || defaults.accept_unknown_host_keys,
                defaults.known_hosts.clone(),
            ));
        remote = if self.lines {
            remote.read_lines()
        } else {
            remote.read_bytes(self.max_bytes)
        };
        Ok(Target::Remote(remote))
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .wrap_err_with(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default()?,
    };
    init_tracing(&config.log);

    let templates = config.commands.clone();

    match cli.command {
        Commands::Run { command, remote } => {
            let target = remote.target(&config.remote)?;
            let output = execute_cmd(&command, &target).await?;
            println!("{}", output.to_text().trim_end());
        }
        Commands::Checksum {
            path,
            algorithm,
            hex,
            options,
        } => {
            let format = if hex {
                ChecksumFormat::Hex
            } else {
                ChecksumFormat::Base64Binary
            };
            let sum =
                testbed_fs::calculate_checksum(&templates, &path, algorithm.into(), format, &options)
                    .await?;
            println!("{sum}");
        }
        Commands::Digest { path, algorithm } => {
            let digest = testbed_fs::file_checksum(&path, algorithm.into())?;
            println!("{}  {}", digest.to_hex(), path.display());
            println!("{}", digest.to_base64());
        }
        Commands::DiskUsage { path } => {
            println!("{}", testbed_fs::disk_usage(&path)?);
        }
        Commands::CreateFile {
            path,
            count,
            device,
            block_size,
        } => {
            let size = FileGenerator::new(templates)
                .create_file(&path, count, &BlockSource { device, block_size })
                .await?;
            println!("{} {size}", path.display());
        }
        Commands::CreateFiles {
            dir,
            min_mb,
            max_mb,
            count,
            prefix,
        } => {
            let listing = FileGenerator::new(templates)
                .create_multiple_size_files(
                    SizeRange { min_mb, max_mb },
                    count,
                    &dir,
                    &prefix,
                    &mut rand::thread_rng(),
                )
                .await?;
            print_json(&listing)?;
        }
        Commands::Split {
            path,
            size_mb,
            parts,
            random,
        } => {
            let sizing = if random {
                PartSizing::Random
            } else {
                PartSizing::Equal
            };
            let parts = FileGenerator::new(templates)
                .split_file(&path, size_mb, parts, sizing)
                .await?;
            print_json(&parts)?;
        }
        Commands::Cleanup { dir } => {
            let removed = testbed_fs::cleanup_dir(&dir)?;
            println!("removed {removed} entries from {}", dir.display());
        }
        Commands::Backup {
            dir,
            restore,
            files,
        } => {
            let action = if restore {
                BackupAction::Restore
            } else {
                BackupAction::Backup
            };
            let written = testbed_fs::backup_or_restore(action, &dir, &files)?;
            print_json(&written)?;
        }
        Commands::Ping { host } => {
            if !HostProbe::new(templates).check_ping(&host).await? {
                bail!("{host} did not answer");
            }
            println!("{host} is reachable");
        }
        Commands::Pgrep { process } => {
            let output = HostProbe::new(templates).pgrep(&process).await?;
            print!("{}", String::from_utf8_lossy(&output));
        }
        Commands::Utility { name, dir } => {
            if !HostProbe::new(templates).is_utility_present(&name, &dir).await? {
                bail!("{name} not found in {dir}");
            }
            println!("{name} found in {dir}");
        }
        Commands::Rpm { action, remote } => {
            let target = remote.target(&config.remote)?;
            let rpm = RpmManager::new(std::sync::Arc::new(target), templates);
            match action {
                RpmAction::Check { name } => print_json(&rpm.is_installed(&name).await?)?,
                RpmAction::List { filter } => {
                    let listing = rpm.list(&filter).await?;
                    if !listing.found() {
                        bail!("no packages match {filter:?}");
                    }
                    for package in listing.packages() {
                        println!("{package}");
                    }
                }
                RpmAction::MachineState { filter, dir } => {
                    print_json(&rpm.machine_state(&filter, &dir).await?)?;
                }
                RpmAction::Install { package } => {
                    let output = rpm.install(&package).await?;
                    println!("{}", output.to_text().trim_end());
                }
            }
        }
    }

    Ok(())
}
