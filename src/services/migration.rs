//! Workspace migration service.
//!
//! Walks every model file of the workspace, upgrades it to the current meta
//! model and either rewrites it in place or, with a version bump, writes it to
//! the next major version directory of its namespace.
//!
//! Enumeration finishes before the first file is touched, so files written by
//! a bump are never visited again in the same run. Per-file failures are
//! recorded in the [`MigrationResult`]; only enumeration failures abort.

use crate::document::{DocumentLoader, DocumentSerializer, DocumentSource, DocumentUpgrader};
use crate::models::{FileOutcome, FileStatus, MigrationResult};
use crate::services::PathResolver;
use crate::storage::walk_model_files;
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Alias file maintained by editors; never migrated.
pub const RESERVED_ALIAS_FILE: &str = "latest.ttl";

/// Options for migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Write every file to the next major version of its namespace.
    pub bump_version: bool,
    /// If true, don't actually write anything.
    pub dry_run: bool,
}

impl MigrationOptions {
    /// Creates options with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bump_version: false,
            dry_run: false,
        }
    }

    /// Sets the `bump_version` option.
    #[must_use]
    pub const fn with_bump_version(mut self, bump_version: bool) -> Self {
        self.bump_version = bump_version;
        self
    }

    /// Sets the `dry_run` option.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Migration service for upgrading a workspace.
pub struct MigrationService {
    resolver: PathResolver,
    loader: Arc<dyn DocumentLoader>,
    upgrader: Arc<dyn DocumentUpgrader>,
    serializer: Arc<dyn DocumentSerializer>,
}

impl MigrationService {
    /// Creates a new migration service.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolver for the workspace to migrate
    /// * `loader` - Parses workspace documents
    /// * `upgrader` - Upgrades documents and rebases namespaces
    /// * `serializer` - Writes migrated documents
    #[must_use]
    pub fn new(
        resolver: PathResolver,
        loader: Arc<dyn DocumentLoader>,
        upgrader: Arc<dyn DocumentUpgrader>,
        serializer: Arc<dyn DocumentSerializer>,
    ) -> Self {
        Self {
            resolver,
            loader,
            upgrader,
            serializer,
        }
    }

    /// Migrates every model file of the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error only if the workspace cannot be enumerated.
    pub fn migrate_workspace(&self, bump_version: bool) -> Result<MigrationResult> {
        self.migrate(&MigrationOptions::new().with_bump_version(bump_version))
    }

    /// Migrates the workspace with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error only if the workspace cannot be enumerated.
    pub fn migrate(&self, options: &MigrationOptions) -> Result<MigrationResult> {
        let files: Vec<_> = walk_model_files(self.resolver.root())?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_none_or(|n| !n.eq_ignore_ascii_case(RESERVED_ALIAS_FILE))
            })
            .collect();

        tracing::info!(
            files = files.len(),
            bump_version = options.bump_version,
            dry_run = options.dry_run,
            "Migrating workspace"
        );

        let mut result = MigrationResult::new();
        for path in &files {
            let Some((namespace, version, file_name)) = self.resolver.identity_from_path(path)
            else {
                let (key, outcome) = self.unmapped(path);
                tracing::warn!(file = %path.display(), "{}", outcome.message);
                metrics::counter!("migration_files_total", "status" => outcome.status.as_str())
                    .increment(1);
                result.record(key, outcome);
                continue;
            };
            let key = format!("{namespace}:{version}");

            let outcome = match self.migrate_file(path, options) {
                Ok(outcome) => outcome,
                Err(e @ Error::Conflict(_)) => {
                    FileOutcome::new(file_name.as_str(), FileStatus::Conflict, e.to_string())
                },
                Err(e) => FileOutcome::new(file_name.as_str(), FileStatus::Failed, e.to_string()),
            };
            if !outcome.success {
                tracing::warn!(file = %path.display(), status = outcome.status.as_str(), "{}", outcome.message);
            }

            metrics::counter!("migration_files_total", "status" => outcome.status.as_str())
                .increment(1);
            result.record(key, outcome);
        }

        tracing::info!(
            changed = result.changed_files(),
            failed = result.failed_files(),
            success = result.success,
            "Workspace migration finished"
        );
        Ok(result)
    }

    /// Failed outcome for a walked file with no `namespace/version/file` identity.
    fn unmapped(&self, path: &Path) -> (String, FileOutcome) {
        let relative = path.strip_prefix(self.resolver.root()).unwrap_or(path);
        let key = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(":")
            })
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let outcome = FileOutcome::new(
            file_name,
            FileStatus::Failed,
            format!(
                "{} does not map to a namespace version",
                relative.display()
            ),
        );
        (key, outcome)
    }

    fn migrate_file(&self, path: &Path, options: &MigrationOptions) -> Result<FileOutcome> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let original = self.loader.parse(DocumentSource::from_path(path)?)?;
        let original_content = original.content().to_string();
        let upgraded = self.upgrader.upgrade(original)?;

        if options.bump_version {
            let current = upgraded.urn()?;
            let next = current.version().next_major();
            let rebased = self.upgrader.rebase(upgraded, next)?;
            let destination = self.resolver.for_document(&rebased)?;

            if destination.exists() {
                return Err(Error::Conflict(format!(
                    "{} already exists",
                    destination.display()
                )));
            }
            if !options.dry_run {
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                        operation: "create_version_dir".to_string(),
                        cause: format!("{}: {e}", parent.display()),
                    })?;
                }
                self.serializer.write(&rebased, &destination)?;
            }
            return Ok(FileOutcome::new(
                file_name,
                FileStatus::Relocated,
                format!("written to {}", destination.display()),
            ));
        }

        if upgraded.content() == original_content {
            return Ok(FileOutcome::new(file_name, FileStatus::Unchanged, "already current"));
        }
        if !options.dry_run {
            self.serializer.write(&upgraded, path)?;
        }
        Ok(FileOutcome::new(
            file_name,
            FileStatus::Upgraded,
            format!(
                "upgraded to meta model {}",
                crate::document::CURRENT_META_MODEL_VERSION
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TurtleDocuments;
    use std::fs;
    use tempfile::TempDir;

    const LEGACY: &str = "@prefix bamm: <urn:bamm:io.openmanufacturing:meta-model:1.0.0#> .
@prefix : <urn:bamm:org.acme:1.0.0#> .
:Foo a bamm:Aspect .
";

    fn service(root: &Path) -> MigrationService {
        MigrationService::new(
            PathResolver::new(root),
            Arc::new(TurtleDocuments),
            Arc::new(TurtleDocuments),
            Arc::new(TurtleDocuments),
        )
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_in_place_upgrade_then_idempotent() {
        let ws = TempDir::new().unwrap();
        write(ws.path(), "org.acme/1.0.0/Foo.ttl", LEGACY);

        let first = service(ws.path()).migrate_workspace(false).unwrap();
        assert!(first.success);
        assert_eq!(first.changed_files(), 1);
        let content = fs::read_to_string(ws.path().join("org.acme/1.0.0/Foo.ttl")).unwrap();
        assert!(content.contains("urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#"));

        let second = service(ws.path()).migrate_workspace(false).unwrap();
        assert!(second.success);
        assert_eq!(second.changed_files(), 0);
        assert_eq!(second.total_files(), 1);
    }

    #[test]
    fn test_bump_relocates_and_keeps_original() {
        let ws = TempDir::new().unwrap();
        write(ws.path(), "org.acme/1.0.0/Foo.ttl", LEGACY);

        let result = service(ws.path()).migrate_workspace(true).unwrap();
        assert!(result.success);
        assert_eq!(result.namespaces["org.acme:1.0.0"][0].status, FileStatus::Relocated);

        let bumped = fs::read_to_string(ws.path().join("org.acme/2.0.0/Foo.ttl")).unwrap();
        assert!(bumped.contains("<urn:samm:org.acme:2.0.0#>"));
        assert!(ws.path().join("org.acme/1.0.0/Foo.ttl").exists());
    }

    #[test]
    fn test_bump_conflict_leaves_existing_untouched() {
        let ws = TempDir::new().unwrap();
        write(ws.path(), "org.acme/1.0.0/Foo.ttl", LEGACY);
        write(ws.path(), "org.acme/2.0.0/Foo.ttl", "existing");

        let result = service(ws.path()).migrate_workspace(true).unwrap();

        assert!(!result.success);
        let outcome = &result.namespaces["org.acme:1.0.0"][0];
        assert_eq!(outcome.status, FileStatus::Conflict);
        assert_eq!(
            fs::read_to_string(ws.path().join("org.acme/2.0.0/Foo.ttl")).unwrap(),
            "existing"
        );
    }

    #[test]
    fn test_failure_does_not_abort_walk() {
        let ws = TempDir::new().unwrap();
        write(ws.path(), "org.acme/1.0.0/Broken.ttl", ":A nope:b :C .");
        write(ws.path(), "org.acme/1.0.0/Foo.ttl", LEGACY);
        write(ws.path(), "org.acme/1.0.0/latest.ttl", "ignored");

        let result = service(ws.path()).migrate_workspace(false).unwrap();

        assert!(!result.success);
        assert_eq!(result.total_files(), 2);
        assert_eq!(result.failed_files(), 1);
        assert_eq!(result.changed_files(), 1);
    }

    #[test]
    fn test_unmapped_file_is_a_failed_outcome() {
        let ws = TempDir::new().unwrap();
        let (key, outcome) = service(ws.path()).unmapped(&ws.path().join("org.acme/Stray.ttl"));

        assert_eq!(key, "org.acme");
        assert_eq!(outcome.file_name, "Stray.ttl");
        assert_eq!(outcome.status, FileStatus::Failed);
        assert!(!outcome.success);

        let mut result = MigrationResult::new();
        result.record(key, outcome);
        assert!(!result.success);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let ws = TempDir::new().unwrap();
        write(ws.path(), "org.acme/1.0.0/Foo.ttl", LEGACY);

        let options = MigrationOptions::new().with_dry_run(true);
        let result = service(ws.path()).migrate(&options).unwrap();

        assert_eq!(result.changed_files(), 1);
        assert_eq!(
            fs::read_to_string(ws.path().join("org.acme/1.0.0/Foo.ttl")).unwrap(),
            LEGACY
        );
    }
}
