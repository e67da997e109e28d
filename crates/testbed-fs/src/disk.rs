//! Disk usage of the filesystem holding a path

use std::path::Path;

use tracing::debug;

use crate::error::FsError;

/// Percent of the filesystem holding `path` that is in use, e.g. `"60.0"`
///
/// # Errors
/// Returns `FsError` if the filesystem cannot be queried
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub fn disk_usage(path: impl AsRef<Path>) -> Result<String, FsError> {
    use nix::sys::statvfs::statvfs;

    let path = path.as_ref();
    let stats = statvfs(path).map_err(|errno| FsError::io(path, &std::io::Error::from(errno)))?;

    let usage = usage_percent(
        stats.blocks() as u64,
        stats.fragment_size() as u64,
        stats.blocks_free() as u64,
    );
    debug!(path = %path.display(), usage = %usage, "disk usage");
    Ok(usage)
}

/// Used share of `blocks` fragments of `frsize` bytes, `bfree` of them free
///
/// Formatted with one decimal. An empty filesystem reports `"0.0"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usage_percent(blocks: u64, frsize: u64, bfree: u64) -> String {
    let total = blocks.saturating_mul(frsize);
    if total == 0 {
        return "0.0".to_string();
    }
    let used = blocks.saturating_sub(bfree).saturating_mul(frsize);
    format!("{:.1}", percent(used as f64, total as f64))
}

/// `part` as a percentage of `total`; progress tracking helper
///
/// A zero `total` yields `0.0` rather than a NaN or infinity.
#[must_use]
pub fn percent(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    part / total * 100.0
}
