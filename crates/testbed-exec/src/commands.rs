//! Shell command templates
//!
//! Templates use named `{placeholders}`. Defaults are built in and every
//! field can be overridden from the `[commands]` table of the config file.

use serde::{Deserialize, Serialize};

/// Command strings filled in by the filesystem and host helpers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    /// `{device}`, `{path}`, `{block_size}`, `{count}`
    pub create_file: String,
    /// `{path}`
    pub list_dir: String,
    pub rpm_list: String,
    /// `{filter}`
    pub rpm_grep: String,
    /// `{package}`
    pub rpm_install: String,
    /// `{process}`
    pub pgrep: String,
    /// `{host}`
    pub ping: String,
    /// `{algorithm}`, `{path}`
    pub checksum_base64: String,
    /// `{algorithm}`, `{options}`, `{path}`
    pub checksum_hex: String,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            create_file: "dd if={device} of={path} bs={block_size} count={count} status=none"
                .to_string(),
            list_dir: "ls {path}".to_string(),
            rpm_list: "rpm -qa".to_string(),
            rpm_grep: "rpm -qa | grep {filter}".to_string(),
            rpm_install: "yum install -y {package}".to_string(),
            pgrep: "pgrep {process}".to_string(),
            ping: "ping -c 1 {host}".to_string(),
            checksum_base64: "openssl {algorithm} -binary {path} | base64".to_string(),
            checksum_hex: "{algorithm}sum {options} {path}".to_string(),
        }
    }
}

/// Substitute `{name}` placeholders in `template`
///
/// Unknown placeholders are left untouched. An empty value also removes one
/// adjacent space so no double gap is left behind; all other whitespace,
/// including inside quotes, is kept. Values are inserted verbatim, not shell
/// quoted, so a path containing spaces must be quoted by the caller.
#[must_use]
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        let placeholder = format!("{{{name}}}");
        if value.is_empty() {
            out = out
                .replace(&format!(" {placeholder} "), " ")
                .replace(&format!("{placeholder} "), "")
                .replace(&format!(" {placeholder}"), "");
        }
        out = out.replace(&placeholder, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_create_file() {
        let t = CommandTemplates::default();
        let cmd = fill(
            &t.create_file,
            &[
                ("device", "/dev/zero"),
                ("path", "/tmp/f"),
                ("block_size", "1M"),
                ("count", "5"),
            ],
        );

        assert_eq!(
            cmd,
            "dd if=/dev/zero of=/tmp/f bs=1M count=5 status=none"
        );
    }

    #[test]
    fn test_fill_collapses_empty_options() {
        let t = CommandTemplates::default();
        let cmd = fill(
            &t.checksum_hex,
            &[("algorithm", "md5"), ("options", ""), ("path", "/tmp/f")],
        );

        assert_eq!(cmd, "md5sum /tmp/f");
    }

    #[test]
    fn test_fill_keeps_literal_spacing() {
        let cmd = fill("echo 'a  b' {opt} | grep {pat}", &[("opt", ""), ("pat", "a  b")]);

        assert_eq!(cmd, "echo 'a  b' | grep a  b");
    }

    #[test]
    fn test_fill_empty_value_at_edges() {
        assert_eq!(fill("{opt} ls {path}", &[("opt", ""), ("path", "")]), "ls");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let t: CommandTemplates = serde_json::from_str(r#"{"rpm_install": "dnf install -y {package}"}"#)
            .unwrap();

        assert_eq!(t.rpm_install, "dnf install -y {package}");
        assert_eq!(t.rpm_list, "rpm -qa");
    }
}
