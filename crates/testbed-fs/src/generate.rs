//! Test file generation: block-copy creation, random-size batches, splitting

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use testbed_exec::commands::fill;
use testbed_exec::{CommandExecutor, CommandTemplates, LocalExecutor};
use tracing::{debug, info, instrument, warn};

use crate::dir::list_dir;
use crate::error::FsError;

/// One mebibyte; file sizes below are given in these units
pub const MB: u64 = 1_048_576;

/// Seed for random part sizes, so a split is reproducible across runs
pub const SPLIT_SEED: u64 = 1_048_576;

/// Input device and block size for the block-copy command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSource {
    pub device: PathBuf,
    pub block_size: String,
}

impl Default for BlockSource {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/zero"),
            block_size: "1M".to_string(),
        }
    }
}

/// Inclusive size range in MB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min_mb: u64,
    pub max_mb: u64,
}

/// How a split divides the source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartSizing {
    /// `total / parts` bytes each, last part takes the remainder
    #[default]
    Equal,
    /// Seeded random size between 10% and 100% of the total per part
    Random,
}

/// One output file of a split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    pub output: PathBuf,
    pub size: u64,
}

/// Creates test files with the local block-copy tool
#[derive(Debug, Clone, Default)]
pub struct FileGenerator {
    templates: CommandTemplates,
    executor: LocalExecutor,
}

impl FileGenerator {
    #[must_use]
    pub fn new(templates: CommandTemplates) -> Self {
        Self {
            templates,
            executor: LocalExecutor::new(),
        }
    }

    /// Create `path` from `count` blocks of `source`, returning its size in bytes
    ///
    /// # Errors
    /// Returns the block-copy command's error, or `FsError` if the result is missing
    #[instrument(skip(self))]
    pub async fn create_file(
        &self,
        path: &Path,
        count: u64,
        source: &BlockSource,
    ) -> Result<u64, FsError> {
        let device = source.device.to_string_lossy();
        let target = path.to_string_lossy();
        let count_str = count.to_string();
        let cmd = fill(
            &self.templates.create_file,
            &[
                ("device", device.as_ref()),
                ("path", target.as_ref()),
                ("block_size", source.block_size.as_str()),
                ("count", count_str.as_str()),
            ],
        );
        debug!(command = %cmd, "creating file");
        self.executor.run(&cmd).await?;

        let size = std::fs::metadata(path)
            .map_err(|e| FsError::io(path, &e))?
            .len();
        debug!(path = %path.display(), size, "file created");
        Ok(size)
    }

    /// Create `count` files named `<prefix><i>` in `dir`, each a random size in `range`
    ///
    /// `dir` is created if missing. Returns the directory listing afterwards.
    ///
    /// # Errors
    /// Returns `FsError::InvalidArgument` for an inverted range, or the first
    /// creation error
    #[instrument(skip(self, rng))]
    pub async fn create_multiple_size_files<R: Rng + ?Sized>(
        &self,
        range: SizeRange,
        count: usize,
        dir: &Path,
        prefix: &str,
        rng: &mut R,
    ) -> Result<Vec<String>, FsError> {
        if range.min_mb > range.max_mb {
            return Err(FsError::InvalidArgument(format!(
                "size range {}..={} MB is empty",
                range.min_mb, range.max_mb
            )));
        }

        if !dir.exists() {
            warn!(dir = %dir.display(), "directory does not exist, creating it");
            std::fs::create_dir(dir).map_err(|e| FsError::io(dir, &e))?;
        }

        let sizes: Vec<u64> = (0..count)
            .map(|_| rng.gen_range(range.min_mb..=range.max_mb))
            .collect();

        info!(count, dir = %dir.display(), "creating files");
        for (i, size_mb) in sizes.into_iter().enumerate() {
            let path = dir.join(format!("{prefix}{i}"));
            self.create_file(&path, size_mb, &BlockSource::default())
                .await?;
        }

        list_dir(dir)
    }

    /// Recreate `path` with `size_mb` MB of zeros and split it into `parts` files
    ///
    /// # Errors
    /// Returns `FsError` if creation or any part write fails
    #[instrument(skip(self))]
    pub async fn split_file(
        &self,
        path: &Path,
        size_mb: u64,
        parts: usize,
        sizing: PartSizing,
    ) -> Result<Vec<SplitPart>, FsError> {
        if parts == 0 {
            return Err(FsError::InvalidArgument("split into zero parts".into()));
        }

        if path.exists() {
            debug!(path = %path.display(), "deleting existing file");
            crate::files::remove_file(path)?;
        }
        self.create_file(path, size_mb, &BlockSource::default())
            .await?;
        info!(path = %path.display(), size_mb, "created file to split");

        let source = path.to_path_buf();
        tokio::task::spawn_blocking(move || split_existing_file(&source, parts, sizing))
            .await
            .map_err(|e| FsError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
    }
}

/// Split an existing file into `parts` files named `<name>_out<i>` beside it
///
/// Reads are sequential. With [`PartSizing::Equal`] the sizes sum to the
/// source size. With [`PartSizing::Random`] each part asks for a seeded
/// random byte count; once the source is exhausted the remaining parts are
/// written short or empty, and bytes never asked for are dropped.
///
/// # Errors
/// Returns `FsError` on any read or write failure
pub fn split_existing_file(
    path: &Path,
    parts: usize,
    sizing: PartSizing,
) -> Result<Vec<SplitPart>, FsError> {
    if parts == 0 {
        return Err(FsError::InvalidArgument("split into zero parts".into()));
    }

    let name = path
        .file_name()
        .ok_or_else(|| FsError::InvalidArgument(format!("{} has no file name", path.display())))?
        .to_string_lossy()
        .into_owned();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut input = File::open(path).map_err(|e| FsError::io(path, &e))?;
    let total = input.metadata().map_err(|e| FsError::io(path, &e))?.len();
    let requests = part_sizes(total, parts, sizing);

    let mut result = Vec::with_capacity(parts);
    for (i, want) in requests.into_iter().enumerate() {
        let output = dir.join(format!("{name}_out{i}"));
        let mut out = File::create(&output).map_err(|e| FsError::io(&output, &e))?;
        let size = io::copy(&mut io::Read::take(&mut input, want), &mut out)
            .map_err(|e| FsError::io(&output, &e))?;
        result.push(SplitPart { output, size });
    }

    debug!(parts = ?result, "file split");
    Ok(result)
}

/// Byte counts requested for each part
fn part_sizes(total: u64, parts: usize, sizing: PartSizing) -> Vec<u64> {
    match sizing {
        PartSizing::Equal => {
            let n = parts as u64;
            let each = total / n;
            let mut sizes = vec![each; parts];
            if let Some(last) = sizes.last_mut() {
                *last += total % n;
            }
            sizes
        }
        PartSizing::Random => {
            let mut rng = ChaCha8Rng::seed_from_u64(SPLIT_SEED);
            (0..parts)
                .map(|_| rng.gen_range(total / 10..=total))
                .collect()
        }
    }
}
