//! Backup CLI command.

use super::{CommandResult, OutputFormat, write_output};
use crate::services::ServiceContainer;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct BackupSummary {
    backup: PathBuf,
}

/// Executes the `backup` command.
///
/// `destination` overrides the configured backup directory.
///
/// # Errors
///
/// Returns an error if the workspace cannot be read or the archive written.
pub fn cmd_backup<W: Write>(
    writer: &mut W,
    services: &ServiceContainer,
    destination: Option<&Path>,
    format: OutputFormat,
) -> CommandResult {
    let backup = match destination {
        Some(dir) => services.backup().clone().with_destination(dir).backup()?,
        None => services.backup().backup()?,
    };
    write_output(writer, format, &BackupSummary { backup })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_to_destination() {
        let ws = TempDir::new().unwrap();
        std::fs::create_dir_all(ws.path().join("org.acme/1.0.0")).unwrap();
        std::fs::write(ws.path().join("org.acme/1.0.0/Foo.ttl"), "x").unwrap();
        let out = TempDir::new().unwrap();

        let services = ServiceContainer::for_root(ws.path());
        let mut buffer = Vec::new();
        cmd_backup(&mut buffer, &services, Some(out.path()), OutputFormat::Json).unwrap();

        let summary: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let written = PathBuf::from(summary["backup"].as_str().unwrap());
        assert_eq!(written.parent().unwrap(), out.path());
        assert!(written.exists());
    }
}
