//! Staged file relocations.
//!
//! Import stages one move per extracted document and hands the whole batch to
//! a [`MoveApplier`]. The filesystem applier renames sequentially; a
//! transactional applier can be injected where one is available.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A staged relocation of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMove {
    /// Current location.
    pub from: PathBuf,
    /// Destination, replaced if it exists.
    pub to: PathBuf,
}

impl FileMove {
    /// Creates a staged move.
    #[must_use]
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Applies batches of staged moves.
pub trait MoveApplier: Send + Sync {
    /// Applies every move in order.
    ///
    /// # Errors
    ///
    /// Returns an error on the first move that fails. Moves applied before the
    /// failure are not rolled back by non-transactional appliers.
    fn apply_moves(&self, moves: &[FileMove]) -> Result<()>;
}

/// Sequential rename-based applier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemMoveApplier;

impl FilesystemMoveApplier {
    /// Creates the applier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply_one(file_move: &FileMove) -> Result<()> {
        if let Some(parent) = file_move.to.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_model_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        if fs::rename(&file_move.from, &file_move.to).is_ok() {
            return Ok(());
        }

        // Rename fails across devices (scratch dirs often live on tmpfs).
        copy_then_remove(&file_move.from, &file_move.to)
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| Error::OperationFailed {
        operation: "move_model_file".to_string(),
        cause: format!("{} -> {}: {e}", from.display(), to.display()),
    })?;
    fs::remove_file(from).map_err(|e| Error::OperationFailed {
        operation: "move_model_file".to_string(),
        cause: format!("{}: {e}", from.display()),
    })
}

impl MoveApplier for FilesystemMoveApplier {
    fn apply_moves(&self, moves: &[FileMove]) -> Result<()> {
        for (applied, file_move) in moves.iter().enumerate() {
            if let Err(e) = Self::apply_one(file_move) {
                tracing::warn!(
                    applied,
                    total = moves.len(),
                    from = %file_move.from.display(),
                    "Move batch aborted"
                );
                return Err(e);
            }
            tracing::debug!(
                from = %file_move.from.display(),
                to = %file_move.to.display(),
                "Moved model file"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("scratch").join("A.ttl");
        fs::create_dir_all(from.parent().unwrap()).unwrap();
        fs::write(&from, "new").unwrap();

        let to = dir.path().join("ws").join("org.acme").join("1.0.0").join("A.ttl");
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, "old").unwrap();

        FilesystemMoveApplier
            .apply_moves(&[FileMove::new(&from, &to)])
            .unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "new");
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = FilesystemMoveApplier.apply_moves(&[FileMove::new(
            dir.path().join("absent.ttl"),
            dir.path().join("out").join("absent.ttl"),
        )]);
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }
}
