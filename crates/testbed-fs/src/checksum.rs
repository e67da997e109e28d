//! File checksums, computed in-process or through a shell pipeline

use std::fmt::Write as _;
use std::path::Path;

use base64::Engine;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use testbed_exec::commands::fill;
use testbed_exec::{CommandExecutor, CommandTemplates, LocalExecutor};
use tracing::{debug, error, instrument};

use crate::error::FsError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Name understood by `openssl` and as the `<name>sum` tool prefix
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Md5 => Md5::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// Digest of a file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub algorithm: DigestAlgorithm,
    pub bytes: Vec<u8>,
}

impl FileDigest {
    /// Lowercase hex, as printed by `md5sum`
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.bytes.iter().fold(String::new(), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }

    /// Base64 of the binary digest, as printed by `openssl <algo> -binary | base64`
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Digest the whole content of `path` in memory
///
/// # Errors
/// Returns `FsError` if the file cannot be read
pub fn file_checksum(path: impl AsRef<Path>, algorithm: DigestAlgorithm) -> Result<FileDigest, FsError> {
    let path = path.as_ref();
    debug!(path = %path.display(), algorithm = algorithm.name(), "calculating checksum of file content");
    let data = std::fs::read(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to read file for checksum");
        FsError::io(path, &e)
    })?;
    Ok(FileDigest {
        algorithm,
        bytes: algorithm.digest(&data),
    })
}

/// Output format of the shell checksum pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumFormat {
    /// `openssl <algo> -binary <path> | base64`
    #[default]
    Base64Binary,
    /// `<algo>sum <options> <path>`
    Hex,
}

/// Checksum `path` with external tools and return their trimmed output
///
/// `options` is spliced into the hex variant's command line only.
///
/// # Errors
/// Returns `FsError::NotFound` for a missing file, or the command's error
#[instrument(skip(templates))]
pub async fn calculate_checksum(
    templates: &CommandTemplates,
    path: &Path,
    algorithm: DigestAlgorithm,
    format: ChecksumFormat,
    options: &str,
) -> Result<String, FsError> {
    if !path.exists() {
        return Err(FsError::NotFound(path.to_path_buf()));
    }

    let path_str = path.to_string_lossy();
    let cmd = match format {
        ChecksumFormat::Base64Binary => fill(
            &templates.checksum_base64,
            &[("algorithm", algorithm.name()), ("path", path_str.as_ref())],
        ),
        ChecksumFormat::Hex => fill(
            &templates.checksum_hex,
            &[
                ("algorithm", algorithm.name()),
                ("options", options),
                ("path", path_str.as_ref()),
            ],
        ),
    };

    debug!(command = %cmd, "executing checksum command");
    let output = LocalExecutor::new().run(&cmd).await?;
    let text = output.to_text().trim().to_string();
    debug!(output = %text, "checksum output");
    Ok(text)
}

/// Digest field of a `md5sum`/`sha256sum` output line
#[must_use]
pub fn parse_sum_line(line: &str) -> Option<&str> {
    line.split_whitespace()
        .next()
        .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_md5() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("abc");
        std::fs::write(&path, "abc").unwrap();

        let digest = file_checksum(&path, DigestAlgorithm::Md5).unwrap();

        assert_eq!(digest.to_hex(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(digest.to_base64(), "kAFQmDzST7DWlj99KOF/cg==");
    }

    #[test]
    fn test_known_sha256() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("abc");
        std::fs::write(&path, "abc").unwrap();

        let digest = file_checksum(&path, DigestAlgorithm::Sha256).unwrap();

        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_checksum_is_stable_and_content_sensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data");
        let mut content = vec![7u8; 4096];
        std::fs::write(&path, &content).unwrap();

        let first = file_checksum(&path, DigestAlgorithm::Md5).unwrap();
        let second = file_checksum(&path, DigestAlgorithm::Md5).unwrap();
        assert_eq!(first, second);

        content[2048] ^= 1;
        std::fs::write(&path, &content).unwrap();
        let changed = file_checksum(&path, DigestAlgorithm::Md5).unwrap();
        assert_ne!(first, changed);
    }

    #[test]
    fn test_missing_file() {
        let result = file_checksum("/definitely/not/here", DigestAlgorithm::Md5);

        assert!(matches!(result, Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_parse_sum_line() {
        assert_eq!(
            parse_sum_line("900150983cd24fb0d6963f7d28e17f72  /tmp/abc"),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(parse_sum_line("md5sum: /tmp/x: No such file"), None);
        assert_eq!(parse_sum_line(""), None);
    }

    #[tokio::test]
    async fn test_pipeline_missing_file() {
        let result = calculate_checksum(
            &CommandTemplates::default(),
            Path::new("/definitely/not/here"),
            DigestAlgorithm::Md5,
            ChecksumFormat::Hex,
            "",
        )
        .await;

        assert!(matches!(result, Err(FsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pipeline_matches_in_process_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("abc");
        std::fs::write(&path, "abc").unwrap();

        let line = calculate_checksum(
            &CommandTemplates::default(),
            &path,
            DigestAlgorithm::Md5,
            ChecksumFormat::Hex,
            "",
        )
        .await
        .unwrap();

        let expected = file_checksum(&path, DigestAlgorithm::Md5).unwrap().to_hex();
        assert_eq!(parse_sum_line(&line), Some(expected.as_str()));
    }
}
