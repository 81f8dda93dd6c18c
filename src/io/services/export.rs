//! Package export service.
//!
//! Resolves the requested elements from the workspace, follows their
//! references transitively and bundles every resulting document into a ZIP
//! package keyed by `namespace/version/filename`.
//!
//! Validation before export hands the caller an [`ExportSession`] instead of
//! filling shared state, so concurrent exports never see each other's files.

use crate::document::{
    DocumentLoader, DocumentSerializer, DocumentValidator, ParsedDocumentSet, Violation,
};
use crate::io::PackageArchiver;
use crate::models::ModelUrn;
use crate::services::PathResolver;
use crate::storage::ModelStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Serialized files awaiting export, produced by
/// [`ExportService::validate_for_export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSession {
    /// Session token.
    pub id: Uuid,
    /// Package path to serialized bytes.
    pub entries: BTreeMap<String, Vec<u8>>,
    /// Violations found while validating the resolved documents.
    pub violations: Vec<Violation>,
}

impl ExportSession {
    /// Returns whether validation found no violations.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns whether the session holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Package paths of the files in the session.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Service for exporting model packages.
pub struct ExportService {
    loader: Arc<dyn DocumentLoader>,
    validator: Arc<dyn DocumentValidator>,
    serializer: Arc<dyn DocumentSerializer>,
    store: Arc<dyn ModelStore>,
    resolver: PathResolver,
    archiver: PackageArchiver,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(
        resolver: PathResolver,
        loader: Arc<dyn DocumentLoader>,
        validator: Arc<dyn DocumentValidator>,
        serializer: Arc<dyn DocumentSerializer>,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            loader,
            validator,
            serializer,
            store,
            resolver,
            archiver: PackageArchiver::new(),
        }
    }

    /// Uses another archiver.
    #[must_use]
    pub const fn with_archiver(mut self, archiver: PackageArchiver) -> Self {
        self.archiver = archiver;
        self
    }

    /// Exports the requested elements and everything they reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing resolves, [`Error::ResolutionError`]
    /// if a transitive reference is missing, or serialization and packing errors.
    pub fn export(&self, urns: &[ModelUrn]) -> Result<Vec<u8>> {
        let set = self.resolve(urns)?;
        if set.is_empty() {
            return Err(not_found(urns));
        }
        let entries = self.serialize(&set)?;
        let bytes = self.archiver.pack(&entries)?;
        tracing::info!(files = entries.len(), "Exported package");
        Ok(bytes)
    }

    /// Resolves, validates and serializes the requested elements.
    ///
    /// The returned session may be empty; [`Self::export_session`] rejects it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionError`] if a transitive reference is missing,
    /// or serialization errors.
    pub fn validate_for_export(&self, urns: &[ModelUrn]) -> Result<ExportSession> {
        let set = self.resolve(urns)?;
        let violations = self.validator.validate(&set);
        let entries = self.serialize(&set)?;
        let session = ExportSession {
            id: Uuid::new_v4(),
            entries,
            violations,
        };
        tracing::debug!(
            session = %session.id,
            files = session.entries.len(),
            violations = session.violations.len(),
            "Prepared export session"
        );
        Ok(session)
    }

    /// Packs a validated session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an empty session, or packing errors.
    pub fn export_session(&self, session: ExportSession) -> Result<Vec<u8>> {
        if session.is_empty() {
            return Err(Error::NotFound(format!(
                "export session {} holds no files",
                session.id
            )));
        }
        self.archiver.pack(&session.entries)
    }

    fn resolve(&self, urns: &[ModelUrn]) -> Result<ParsedDocumentSet> {
        self.loader.resolve(urns, self.store.as_ref())
    }

    fn serialize(&self, set: &ParsedDocumentSet) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut entries = BTreeMap::new();
        for doc in set {
            let path = self.resolver.package_path(doc)?;
            let bytes = self.serializer.to_bytes(doc)?;
            entries.insert(path, bytes);
        }
        Ok(entries)
    }
}

fn not_found(urns: &[ModelUrn]) -> Error {
    let requested: Vec<String> = urns.iter().map(ToString::to_string).collect();
    Error::NotFound(format!("no models resolved for [{}]", requested.join(", ")))
}
