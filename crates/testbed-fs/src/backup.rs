//! Backup and restore of individual files through a side directory

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::error::FsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupAction {
    /// Copy each file into the backup directory
    Backup,
    /// Copy each file from the backup directory back where it came from
    Restore,
}

/// Back up `files` into `backup_dir`, or restore them from it
///
/// Files are matched by basename inside `backup_dir`. The first failing copy
/// aborts the batch; copies already made are left in place. Returns the
/// destination of every copy.
///
/// # Errors
/// Returns `FsError::NotFound` when restoring from a missing backup
/// directory, or the first copy error
#[instrument(skip(files), fields(count = files.len()))]
pub fn backup_or_restore<P: AsRef<Path>>(
    action: BackupAction,
    backup_dir: &Path,
    files: &[P],
) -> Result<Vec<PathBuf>, FsError> {
    match action {
        BackupAction::Backup => {
            if !backup_dir.exists() {
                fs::create_dir(backup_dir).map_err(|e| FsError::io(backup_dir, &e))?;
            }
            info!(dir = %backup_dir.display(), "starting backup");
        }
        BackupAction::Restore => {
            if !backup_dir.is_dir() {
                error!(dir = %backup_dir.display(), "backup directory does not exist");
                return Err(FsError::NotFound(backup_dir.to_path_buf()));
            }
            info!(dir = %backup_dir.display(), "starting restore");
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        let name = file
            .file_name()
            .ok_or_else(|| FsError::InvalidArgument(format!("{} has no file name", file.display())))?;

        let (from, to) = match action {
            BackupAction::Backup => (file.to_path_buf(), backup_dir.join(name)),
            BackupAction::Restore => (backup_dir.join(name), file.to_path_buf()),
        };

        fs::copy(&from, &to).map_err(|e| {
            error!(from = %from.display(), to = %to.display(), error = %e, "copy failed");
            FsError::io(&from, &e)
        })?;
        debug!(from = %from.display(), to = %to.display(), "copied");
        written.push(to);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_then_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        let backup = tmp.path().join("backup");
        fs::create_dir(&work).unwrap();
        let a = work.join("a.conf");
        let b = work.join("b.conf");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, "beta").unwrap();

        let copied = backup_or_restore(BackupAction::Backup, &backup, &[&a, &b]).unwrap();
        assert_eq!(copied, vec![backup.join("a.conf"), backup.join("b.conf")]);

        fs::write(&a, "clobbered").unwrap();
        fs::remove_file(&b).unwrap();

        let restored = backup_or_restore(BackupAction::Restore, &backup, &[&a, &b]).unwrap();
        assert_eq!(restored, vec![a.clone(), b.clone()]);
        assert_eq!(fs::read_to_string(&a).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(&b).unwrap(), "beta");
    }

    #[test]
    fn test_restore_without_backup_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let result = backup_or_restore(
            BackupAction::Restore,
            &tmp.path().join("missing"),
            &[tmp.path().join("a")],
        );

        assert!(matches!(result, Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_backup_stops_at_first_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let backup = tmp.path().join("backup");
        let present = tmp.path().join("present");
        let missing = tmp.path().join("missing");
        let later = tmp.path().join("later");
        fs::write(&present, "1").unwrap();
        fs::write(&later, "3").unwrap();

        let result = backup_or_restore(BackupAction::Backup, &backup, &[&present, &missing, &later]);

        assert!(matches!(result, Err(FsError::NotFound(_))));
        assert!(backup.join("present").exists());
        assert!(!backup.join("later").exists());
    }
}
