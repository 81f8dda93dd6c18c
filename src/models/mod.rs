//! Data models for the workspace.
//!
//! This module contains the identities, file descriptors and derived
//! per-request structures used throughout the system.

mod grouping;
mod migration;
mod model_file;
mod urn;

pub use grouping::{NamespaceGrouping, VersionGroup};
pub use migration::{FileOutcome, FileStatus, MigrationResult};
pub use model_file::{MODEL_FILE_EXTENSION, ModelFile, is_model_file};
pub use urn::{BAMM_URN_PREFIX, META_MODEL_NAMESPACES, ModelUrn, ModelVersion, SAMM_URN_PREFIX};
