//! Model storage backends.
//!
//! Provides namespace-scoped storage for model documents with pluggable
//! backends:
//!
//! | Backend | Location |
//! |---------|----------|
//! | Filesystem | `{workspace_root}/{namespace}/{version}/{element}.ttl` |
//! | Memory | Process memory, lost on exit |

mod filesystem;
mod memory;
mod traits;

pub use filesystem::{FilesystemModelStore, collect_model_files, walk_model_files};
pub use memory::InMemoryModelStore;
pub use traits::ModelStore;

use crate::config::{StoreBackendType, WorkspaceConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Factory for creating model stores.
pub struct ModelStoreFactory;

impl ModelStoreFactory {
    /// Creates the store selected by the configuration.
    #[must_use]
    pub fn from_config(config: &WorkspaceConfig) -> Arc<dyn ModelStore> {
        Self::create_with_backend(config.store, config.workspace_root.clone())
    }

    /// Creates a store with an explicit backend type.
    ///
    /// # Arguments
    ///
    /// * `backend` - The backend type to use
    /// * `root` - Workspace root for the filesystem backend
    #[must_use]
    pub fn create_with_backend(backend: StoreBackendType, root: PathBuf) -> Arc<dyn ModelStore> {
        match backend {
            StoreBackendType::Filesystem => {
                tracing::debug!(root = %root.display(), "Using filesystem model store");
                Arc::new(FilesystemModelStore::new(root))
            },
            StoreBackendType::Memory => {
                tracing::debug!("Using in-memory model store");
                Arc::new(InMemoryModelStore::new())
            },
        }
    }
}
