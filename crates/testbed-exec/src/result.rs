//! Result types for command execution

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw capture of a finished command, before any success classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success, -1 when none was reported)
    pub status: i32,
    /// stdout bytes
    pub stdout: Vec<u8>,
    /// stderr bytes
    pub stderr: Vec<u8>,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// How remote stdout/stderr are read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadMode {
    /// Split into lines, each trimmed of surrounding whitespace
    ///
    /// Lines that are blank after trimming are dropped.
    Lines,
    /// Raw bytes, truncated to `limit` when set
    Raw {
        /// Maximum number of stdout bytes kept
        limit: Option<usize>,
    },
}

impl Default for ReadMode {
    fn default() -> Self {
        ReadMode::Raw { limit: None }
    }
}

/// Output of a successful command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutput {
    Bytes(Vec<u8>),
    Lines(Vec<String>),
}

impl CommandOutput {
    /// Output as trimmed, non-empty lines
    ///
    /// Returns `None` for byte output that is not valid UTF-8.
    #[must_use]
    pub fn lines(&self) -> Option<Vec<String>> {
        match self {
            CommandOutput::Lines(lines) => Some(
                lines
                    .iter()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect(),
            ),
            CommandOutput::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(split_lines),
        }
    }

    /// Output as text, lines joined with `\n`
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            CommandOutput::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            CommandOutput::Lines(lines) => lines.join("\n"),
        }
    }

    /// Raw bytes of the output
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CommandOutput::Bytes(bytes) => bytes,
            CommandOutput::Lines(lines) => lines.join("\n").into_bytes(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            CommandOutput::Bytes(bytes) => bytes.is_empty(),
            CommandOutput::Lines(lines) => lines.is_empty(),
        }
    }
}

/// Split text into trimmed, non-empty lines
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Check that every keyword appears in at least one line of `output`
#[must_use]
pub fn validate_output<S: AsRef<str>>(output: &[S], keywords: &[&str]) -> bool {
    keywords
        .iter()
        .all(|kw| output.iter().any(|line| line.as_ref().trim().contains(kw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_drops_blank_lines() {
        assert_eq!(
            split_lines("\n  a \n\t\n b\n\n"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_lines_from_bytes() {
        let out = CommandOutput::Bytes(b"  foo-1.2\n\nbar-3.4  \n".to_vec());
        assert_eq!(
            out.lines(),
            Some(vec!["foo-1.2".to_string(), "bar-3.4".to_string()])
        );
    }

    #[test]
    fn test_lines_rejects_binary() {
        let out = CommandOutput::Bytes(vec![0xff, 0xfe, 0x00]);
        assert_eq!(out.lines(), None);
    }

    #[test]
    fn test_validate_output() {
        let lines = ["cluster: online", "  node-1 started "];
        assert!(validate_output(&lines, &["online", "started"]));
        assert!(!validate_output(&lines, &["online", "stopped"]));
        assert!(validate_output(&lines, &[]));
    }
}
