//! Package import/export subsystem.
//!
//! Model files travel between workspaces as ZIP packages whose entries are
//! keyed by `namespace/version/filename`.
//!
//! # Architecture
//!
//! - **Archiver** packs and unpacks ZIP bytes, rejecting unsafe entries
//! - **Services** orchestrate document loading, validation and placement
//!
//! # Examples
//!
//! ## Preview, then import selected members
//!
//! ```rust,ignore
//! use aspect_workspace::io::ImportOptions;
//!
//! let report = services.import().validate_package(&zip)?;
//! let members: Vec<_> = report.entries.iter().map(|e| e.member.clone()).collect();
//! let grouping = services
//!     .import()
//!     .import_package(&zip, &ImportOptions::default().with_selected(members))?;
//! ```
//!
//! ## Export an aspect with its dependencies
//!
//! ```rust,ignore
//! let urn = ModelUrn::parse("urn:samm:org.acme:1.0.0#Movement")?;
//! let zip = services.export().export(&[urn])?;
//! ```

pub mod archive;
pub mod security;
pub mod services;

// Re-exports for convenience
pub use archive::{ArchiveLimits, PackageArchiver};
pub use security::{EntryDisposition, EntryValidator};
pub use services::{
    ExportService, ExportSession, ImportOptions, ImportService, MissingElement, PackageEntry,
    PackageReport,
};
