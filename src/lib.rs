//! # Aspect Workspace
//!
//! Workspace management for Aspect Model documents (RDF/Turtle files).
//!
//! Model files live under a fixed hierarchy rooted at a workspace directory:
//!
//! ```text
//! <root>/<namespace>/<version>/<Element>.ttl
//! ```
//!
//! The crate mediates between an external model parsing/validation library
//! and persistent storage:
//!
//! - ZIP package import (with a preview/confirm flow) and export
//! - Workspace-wide meta model migration with optional major version bumps
//! - Timestamped workspace backups
//! - Namespace-scoped model storage behind a pluggable [`ModelStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use aspect_workspace::{ServiceContainer, WorkspaceConfig};
//!
//! let services = ServiceContainer::from_config(&WorkspaceConfig::default());
//! let grouping = services.import().import_package(&zip_bytes, &Default::default())?;
//! let report = services.migration().migrate_workspace(true)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod document;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{LoggingSettings, StoreBackendType, WorkspaceConfig};
pub use document::{
    DocumentLoader, DocumentSerializer, DocumentSource, DocumentUpgrader, DocumentValidator,
    ParsedDocument, ParsedDocumentSet, TurtleDocuments, Violation, ViolationKind,
};
pub use io::{
    ExportService, ExportSession, ImportOptions, ImportService, PackageArchiver, PackageReport,
};
pub use models::{
    FileOutcome, FileStatus, MigrationResult, ModelFile, ModelUrn, ModelVersion,
    NamespaceGrouping, VersionGroup,
};
pub use services::{BackupService, MigrationService, PathResolver, ServiceContainer};
pub use storage::{FilesystemModelStore, InMemoryModelStore, ModelStore, MoveApplier};

/// Error type for workspace operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotFound` | A requested model or export resolves to nothing |
/// | `InvalidIdentity` | No URN can be discovered for a document, malformed URN |
/// | `SecurityViolation` | An archive entry escapes the extraction root |
/// | `FileNameError` | An archive entry name contains disallowed characters |
/// | `Conflict` | A migration destination already exists |
/// | `ResolutionError` | Invalid document syntax or an unresolved reference |
/// | `UnsupportedVersion` | The upgrader cannot handle a document's meta model version |
/// | `OperationFailed` | I/O and archive failures |
/// | `InvalidInput` | Malformed arguments or configuration |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A model, namespace or export selection resolved to nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// No semantic identity could be discovered.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// An archive entry would be written outside the destination root.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// An archive entry name contains characters outside the allowed set.
    #[error("invalid file name: {0}")]
    FileNameError(String),

    /// The destination already exists and overwriting is not allowed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Document syntax is invalid or a reference could not be resolved.
    #[error("resolution error: {0}")]
    ResolutionError(String),

    /// The document's meta model version cannot be upgraded.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// An I/O or archive operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Creates an [`Error::OperationFailed`] from an operation name and cause.
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("urn:samm:ns:1.0.0#A".to_string());
        assert_eq!(err.to_string(), "not found: urn:samm:ns:1.0.0#A");

        let err = Error::operation("write_model", "disk full");
        assert_eq!(err.to_string(), "operation 'write_model' failed: disk full");

        let err = Error::SecurityViolation("../evil.ttl".to_string());
        assert!(err.to_string().contains("security violation"));
    }
}
