//! Business logic services.
//!
//! Services orchestrate the document collaborators, the model store and the
//! package archiver into workspace operations.
//!
//! # Architecture
//!
//! ```text
//! ServiceContainer
//!   ├── import()    → ImportService    (validate_package, import_package)
//!   ├── export()    → ExportService    (export, validate_for_export, export_session)
//!   ├── migration() → MigrationService (migrate_workspace)
//!   ├── backup()    → BackupService    (backup)
//!   └── store()     → Arc<dyn ModelStore>
//! ```

mod backup;
mod migration;
mod path_resolver;

pub use backup::{BACKUP_TIMESTAMP_FORMAT, BackupService};
pub use migration::{MigrationOptions, MigrationService, RESERVED_ALIAS_FILE};
pub use path_resolver::PathResolver;

use crate::config::WorkspaceConfig;
use crate::document::TurtleDocuments;
use crate::io::{ExportService, ImportService};
use crate::storage::{ModelStore, ModelStoreFactory};
use std::path::Path;
use std::sync::Arc;

/// Wires every service for one workspace.
///
/// All services share a single set of document collaborators and one store.
pub struct ServiceContainer {
    resolver: PathResolver,
    store: Arc<dyn ModelStore>,
    import: ImportService,
    export: ExportService,
    migration: MigrationService,
    backup: BackupService,
}

impl ServiceContainer {
    /// Creates the services described by a configuration.
    #[must_use]
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        let store = ModelStoreFactory::from_config(config);
        let mut container = Self::with_store(&config.workspace_root, store);
        if let Some(destination) = &config.backup_dir {
            container.backup = container.backup.with_destination(destination);
        }
        container
    }

    /// Creates services for a workspace root with the filesystem store.
    #[must_use]
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let store = ModelStoreFactory::create_with_backend(
            crate::config::StoreBackendType::Filesystem,
            root.to_path_buf(),
        );
        Self::with_store(root, store)
    }

    /// Creates services for a workspace root with an explicit store.
    #[must_use]
    pub fn with_store(root: impl AsRef<Path>, store: Arc<dyn ModelStore>) -> Self {
        let root = root.as_ref();
        let resolver = PathResolver::new(root);
        let documents = Arc::new(TurtleDocuments::new());

        let import = ImportService::new(
            resolver.clone(),
            documents.clone(),
            documents.clone(),
            Arc::clone(&store),
        );
        let export = ExportService::new(
            resolver.clone(),
            documents.clone(),
            documents.clone(),
            documents.clone(),
            Arc::clone(&store),
        );
        let migration = MigrationService::new(
            resolver.clone(),
            documents.clone(),
            documents.clone(),
            documents,
        );
        let backup = BackupService::new(root);

        Self {
            resolver,
            store,
            import,
            export,
            migration,
            backup,
        }
    }

    /// Returns the workspace path resolver.
    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Returns the model store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn ModelStore> {
        Arc::clone(&self.store)
    }

    /// Returns the import service.
    #[must_use]
    pub const fn import(&self) -> &ImportService {
        &self.import
    }

    /// Returns the export service.
    #[must_use]
    pub const fn export(&self) -> &ExportService {
        &self.export
    }

    /// Returns the migration service.
    #[must_use]
    pub const fn migration(&self) -> &MigrationService {
        &self.migration
    }

    /// Returns the backup service.
    #[must_use]
    pub const fn backup(&self) -> &BackupService {
        &self.backup
    }
}
