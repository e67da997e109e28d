//! SSH credentials and their resolution into an auth method

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use russh::keys::{PrivateKey, decode_secret_key, load_secret_key};
use tracing::debug;

/// How to authenticate an SSH session
#[derive(Clone)]
pub enum Credential {
    /// Plain password
    Password(String),
    /// Private key file on disk (must not be group/world readable)
    KeyFile(PathBuf),
    /// Base64-encoded private key held in an environment variable
    EnvKey(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Credential::EnvKey(var) => f.debug_tuple("EnvKey").field(var).finish(),
        }
    }
}

/// Credential ready to hand to the SSH client
pub(crate) enum AuthMethod {
    Password(String),
    Key(PrivateKey),
}

impl Credential {
    /// Load key material, if any
    ///
    /// # Errors
    /// Returns `CredentialError` if the key cannot be read or decoded
    pub(crate) fn resolve(&self) -> Result<AuthMethod, CredentialError> {
        match self {
            Credential::Password(password) => Ok(AuthMethod::Password(password.clone())),
            Credential::KeyFile(path) => {
                validate_key_permissions(path)?;
                let key = load_secret_key(path, None)
                    .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
                debug!(path = %path.display(), "loaded SSH key file");
                Ok(AuthMethod::Key(key))
            }
            Credential::EnvKey(var_name) => {
                let encoded =
                    env::var(var_name).map_err(|_| CredentialError::EnvNotSet(var_name.clone()))?;
                let pem = base64_decode(&encoded)?;
                let key = decode_secret_key(&pem, None)
                    .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
                debug!(var = %var_name, "decoded SSH key from environment");
                Ok(AuthMethod::Key(key))
            }
        }
    }
}

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn base64_decode(input: &str) -> Result<String, CredentialError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|_| CredentialError::InvalidBase64)?;
    String::from_utf8(bytes).map_err(|_| CredentialError::InvalidBase64)
}

#[cfg(unix)]
fn validate_key_permissions(path: &Path) -> Result<(), CredentialError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group and other bits must be clear
    if mode & 0o77 != 0 {
        return Err(CredentialError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_key_permissions(path: &Path) -> Result<(), CredentialError> {
    std::fs::metadata(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_redacted() {
        let cred = Credential::Password("hunter2".into());
        let shown = format!("{cred:?}");

        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn test_missing_env_key() {
        let cred = Credential::EnvKey("TESTBED_KEY_THAT_IS_NEVER_SET".into());

        assert!(matches!(cred.resolve(), Err(CredentialError::EnvNotSet(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_test");
        std::fs::write(&path, "not a key").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let cred = Credential::KeyFile(path);
        assert!(matches!(
            cred.resolve(),
            Err(CredentialError::BadPermissions(_))
        ));
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(
            base64_decode("***"),
            Err(CredentialError::InvalidBase64)
        ));
    }
}
