//! Import and export service implementations.
//!
//! Orchestrates archive handling, document loading and workspace placement.

pub mod export;
pub mod import;

pub use export::{ExportService, ExportSession};
pub use import::{ImportOptions, ImportService, MissingElement, PackageEntry, PackageReport};
