//! testbed-fs: Filesystem and file content helpers for test harnesses
//!
//! Directory management, backups, disk usage, checksums and generation of
//! sized test files.

pub mod backup;
pub mod checksum;
pub mod dir;
pub mod disk;
pub mod error;
pub mod files;
pub mod generate;

pub use backup::{BackupAction, backup_or_restore};
pub use checksum::{ChecksumFormat, DigestAlgorithm, FileDigest, calculate_checksum, file_checksum};
pub use dir::{cleanup_dir, dir_contains, list_dir, make_dir, make_dirs, remove_dir};
#[cfg(unix)]
pub use disk::disk_usage;
pub use disk::{percent, usage_percent};
pub use error::FsError;
pub use files::{create_symlink, open_empty_file, remove_file};
pub use generate::{BlockSource, FileGenerator, PartSizing, SizeRange, SplitPart, split_existing_file};
