//! Workspace backups.
//!
//! Bundles every model file under the workspace root into
//! `backup-<yyyy.MM.dd-HH.mm.ss>.zip`, keeping paths relative to the root.

use crate::io::PackageArchiver;
use crate::storage::collect_model_files;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format of backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

/// Creates timestamped workspace backups.
#[derive(Debug, Clone)]
pub struct BackupService {
    root: PathBuf,
    destination: Option<PathBuf>,
    archiver: PackageArchiver,
}

impl BackupService {
    /// Creates a backup service writing into the workspace root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            destination: None,
            archiver: PackageArchiver::new(),
        }
    }

    /// Writes backups to another directory.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Returns the directory backups are written to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.root)
    }

    /// Returns the backup file name for a point in time.
    #[must_use]
    pub fn file_name(at: &DateTime<Local>) -> String {
        format!("backup-{}.zip", at.format(BACKUP_TIMESTAMP_FORMAT))
    }

    /// Backs up the workspace now.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be read or the archive written.
    pub fn backup(&self) -> Result<PathBuf> {
        self.backup_at(&Local::now())
    }

    /// Backs up the workspace, naming the archive after `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be read or the archive written.
    pub fn backup_at(&self, at: &DateTime<Local>) -> Result<PathBuf> {
        let mut entries = BTreeMap::new();
        for path in collect_model_files(&self.root)? {
            let relative = path
                .strip_prefix(&self.root)
                .map_err(|e| Error::operation("backup_workspace", e))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(&path)
                .map_err(|e| Error::operation("backup_workspace", format!("{}: {e}", path.display())))?;
            entries.insert(name, bytes);
        }

        let bytes = self.archiver.pack_snapshot(&entries)?;

        let destination = self.destination();
        fs::create_dir_all(destination).map_err(|e| Error::OperationFailed {
            operation: "create_backup_dir".to_string(),
            cause: format!("{}: {e}", destination.display()),
        })?;
        let target = destination.join(Self::file_name(at));
        fs::write(&target, bytes).map_err(|e| Error::OperationFailed {
            operation: "write_backup".to_string(),
            cause: format!("{}: {e}", target.display()),
        })?;

        metrics::counter!("backups_created_total").increment(1);
        tracing::info!(files = entries.len(), backup = %target.display(), "Created workspace backup");
        Ok(target)
    }
}
