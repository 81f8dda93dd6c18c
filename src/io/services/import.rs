//! Package import service.
//!
//! Imports a ZIP package of model files into the workspace in two phases:
//!
//! 1. [`ImportService::validate_package`] previews the package: every member's
//!    identity, target path and problems, plus elements the package references
//!    but neither it nor the workspace defines.
//! 2. [`ImportService::import_package`] loads every member as one set, so
//!    references between members resolve, and moves the selected members to
//!    their canonical locations.

use crate::document::{
    DocumentLoader, DocumentSource, DocumentValidator, ParsedDocument, ParsedDocumentSet,
    ViolationKind, locate_definition,
};
use crate::io::PackageArchiver;
use crate::models::{ModelFile, ModelUrn, NamespaceGrouping, is_model_file};
use crate::services::PathResolver;
use crate::storage::{FileMove, FilesystemMoveApplier, ModelStore, MoveApplier};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Options for package import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Package members to write, as `/` separated package paths. `None`
    /// writes every member.
    pub selected: Option<Vec<String>>,
}

impl ImportOptions {
    /// Restricts the import to the given members.
    #[must_use]
    pub fn with_selected<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = Some(members.into_iter().map(Into::into).collect());
        self
    }

    fn is_selected(&self, member: &str) -> bool {
        self.selected
            .as_ref()
            .is_none_or(|selected| selected.iter().any(|s| s == member))
    }
}

/// Preview of one package member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    /// Package path of the member.
    pub member: String,
    /// Discovered identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urn: Option<ModelUrn>,
    /// Canonical workspace location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Whether a file already exists at the target.
    pub exists_in_workspace: bool,
    /// Problems found for this member.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// An element the package references that nothing defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingElement {
    /// The missing element.
    pub urn: ModelUrn,
    /// Where the workspace would expect its file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_path: Option<PathBuf>,
    /// Package members referencing it.
    pub referenced_by: Vec<String>,
}

/// Result of previewing a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    /// One entry per model file in the package, in package order.
    pub entries: Vec<PackageEntry>,
    /// Referenced elements defined neither in the package nor the workspace.
    pub missing: Vec<MissingElement>,
}

impl PackageReport {
    /// Returns whether the whole package can be imported.
    #[must_use]
    pub fn is_importable(&self) -> bool {
        !self.entries.is_empty()
            && self.missing.is_empty()
            && self.entries.iter().all(|e| e.errors.is_empty())
    }

    /// Members that would replace an existing workspace file.
    #[must_use]
    pub fn existing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.exists_in_workspace)
            .map(|e| e.member.as_str())
            .collect()
    }
}

/// Service for importing model packages.
pub struct ImportService {
    resolver: PathResolver,
    loader: Arc<dyn DocumentLoader>,
    validator: Arc<dyn DocumentValidator>,
    store: Arc<dyn ModelStore>,
    mover: Arc<dyn MoveApplier>,
    archiver: PackageArchiver,
}

impl ImportService {
    /// Creates an import service that moves files with sequential renames.
    #[must_use]
    pub fn new(
        resolver: PathResolver,
        loader: Arc<dyn DocumentLoader>,
        validator: Arc<dyn DocumentValidator>,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            resolver,
            loader,
            validator,
            store,
            mover: Arc::new(FilesystemMoveApplier::new()),
            archiver: PackageArchiver::new(),
        }
    }

    /// Uses another move applier, for example a transactional one.
    #[must_use]
    pub fn with_move_applier(mut self, mover: Arc<dyn MoveApplier>) -> Self {
        self.mover = mover;
        self
    }

    /// Uses another archiver.
    #[must_use]
    pub const fn with_archiver(mut self, archiver: PackageArchiver) -> Self {
        self.archiver = archiver;
        self
    }

    /// Imports a package into the workspace.
    ///
    /// Returns the grouping of the written files at their final locations.
    ///
    /// # Errors
    ///
    /// - [`Error::SecurityViolation`] / [`Error::FileNameError`] for unsafe archives
    /// - [`Error::NotFound`] if the package has no model files or a selected member is absent
    /// - [`Error::ResolutionError`] if a document is invalid or a reference is unresolved
    /// - [`Error::InvalidIdentity`] if a written member has no identity
    /// - [`Error::Conflict`] if two members map to the same location
    pub fn import_package(&self, zip: &[u8], options: &ImportOptions) -> Result<NamespaceGrouping> {
        let scratch = scratch_dir()?;
        let files = self.extract_model_files(zip, scratch.path())?;

        let members: Vec<String> = files
            .iter()
            .map(|path| member_name(scratch.path(), path))
            .collect();
        if let Some(selected) = &options.selected {
            for wanted in selected {
                if !members.contains(wanted) {
                    return Err(Error::NotFound(format!("package member {wanted}")));
                }
            }
        }

        let sources = files
            .into_iter()
            .map(DocumentSource::from_path)
            .collect::<Result<Vec<_>>>()?;
        let set = self.loader.load_with_store(sources, self.store.as_ref())?;

        let (moves, written) = self.stage_moves(&set, scratch.path(), options)?;
        self.mover.apply_moves(&moves)?;

        metrics::counter!("packages_imported_total").increment(1);
        tracing::info!(
            files = written.len(),
            root = %self.resolver.root().display(),
            "Imported package"
        );
        Ok(NamespaceGrouping::from_files(written))
    }

    /// Previews a package without touching the workspace.
    ///
    /// Per-member parse and identity failures are collected in the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unsafe or unreadable, or the package
    /// contains no model files.
    pub fn validate_package(&self, zip: &[u8]) -> Result<PackageReport> {
        let scratch = scratch_dir()?;
        let files = self.extract_model_files(zip, scratch.path())?;

        let mut entries = Vec::with_capacity(files.len());
        let mut parsed = Vec::new();

        for path in files {
            let member = member_name(scratch.path(), &path);
            match DocumentSource::from_path(&path).and_then(|s| self.loader.parse(s)) {
                Ok(doc) => {
                    entries.push(self.preview(member, &doc));
                    parsed.push(doc);
                },
                Err(e) => entries.push(PackageEntry {
                    member,
                    urn: None,
                    target: None,
                    exists_in_workspace: false,
                    errors: vec![e.to_string()],
                }),
            }
        }

        let set = ParsedDocumentSet::new(parsed);
        let mut missing: BTreeMap<ModelUrn, BTreeSet<String>> = BTreeMap::new();

        for violation in self.validator.validate(&set) {
            let member = violation
                .location
                .as_deref()
                .map(|location| member_name(scratch.path(), location));

            if violation.kind == ViolationKind::Processing
                && let Some(focus) = &violation.focus
            {
                if locate_definition(self.loader.as_ref(), self.store.as_ref(), focus)?.is_some() {
                    continue;
                }
                missing
                    .entry(focus.clone())
                    .or_default()
                    .extend(member.iter().cloned());
            }

            if let Some(entry) = member
                .as_ref()
                .and_then(|m| entries.iter_mut().find(|e| &e.member == m))
                && !entry.errors.contains(&violation.message)
            {
                entry.errors.push(violation.message);
            }
        }

        let missing = missing
            .into_iter()
            .map(|(urn, referenced_by)| MissingElement {
                expected_path: self.resolver.for_urn(&urn).ok(),
                urn,
                referenced_by: referenced_by.into_iter().collect(),
            })
            .collect();

        Ok(PackageReport { entries, missing })
    }

    fn preview(&self, member: String, doc: &ParsedDocument) -> PackageEntry {
        match doc.urn().and_then(|urn| Ok((urn, self.resolver.for_document(doc)?))) {
            Ok((urn, target)) => PackageEntry {
                member,
                urn: Some(urn),
                exists_in_workspace: target.exists(),
                target: Some(target),
                errors: Vec::new(),
            },
            Err(e) => PackageEntry {
                member,
                urn: None,
                target: None,
                exists_in_workspace: false,
                errors: vec![e.to_string()],
            },
        }
    }

    fn extract_model_files(&self, zip: &[u8], scratch: &Path) -> Result<Vec<PathBuf>> {
        let files: Vec<PathBuf> = self
            .archiver
            .unpack(zip, scratch)?
            .into_iter()
            .filter(|path| is_model_file(path))
            .collect();

        if files.is_empty() {
            return Err(Error::NotFound("package contains no model files".to_string()));
        }
        Ok(files)
    }

    fn stage_moves(
        &self,
        set: &ParsedDocumentSet,
        scratch: &Path,
        options: &ImportOptions,
    ) -> Result<(Vec<FileMove>, Vec<ModelFile>)> {
        let mut moves: Vec<FileMove> = Vec::new();
        let mut written = Vec::new();

        for doc in set {
            let from = doc.location().ok_or_else(|| {
                Error::operation("stage_import", "loaded document has no location")
            })?;
            if !options.is_selected(&member_name(scratch, from)) {
                continue;
            }

            let to = self.resolver.for_document(doc)?;
            if moves.iter().any(|m| m.to == to) {
                return Err(Error::Conflict(format!(
                    "several package members map to {}",
                    to.display()
                )));
            }

            written.push(doc.to_model_file().with_location(&to));
            moves.push(FileMove::new(from, to));
        }

        Ok((moves, written))
    }
}

fn scratch_dir() -> Result<TempDir> {
    TempDir::new().map_err(|e| Error::operation("create_scratch_dir", e))
}

/// `/` separated path of an extracted file relative to the scratch root.
fn member_name(scratch: &Path, path: &Path) -> String {
    path.strip_prefix(scratch)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TurtleDocuments;
    use crate::storage::InMemoryModelStore;

    const FOO: &str = "@prefix samm: <urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#> .
@prefix : <urn:samm:org.acme:1.0.0#> .
:Foo a samm:Aspect ;
   samm:properties ( :Bar ) .
";
    const BAR: &str = "@prefix samm: <urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#> .
@prefix : <urn:samm:org.acme:1.0.0#> .
:Bar a samm:Property .
";

    fn package(entries: &[(&str, &str)]) -> Vec<u8> {
        let entries = entries
            .iter()
            .map(|(name, content)| ((*name).to_string(), content.as_bytes().to_vec()))
            .collect();
        PackageArchiver::new().pack(&entries).unwrap()
    }

    fn service(root: &Path) -> ImportService {
        ImportService::new(
            PathResolver::new(root),
            Arc::new(TurtleDocuments),
            Arc::new(TurtleDocuments),
            Arc::new(InMemoryModelStore::new()),
        )
    }

    #[test]
    fn test_import_places_files() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("any/Foo.ttl", FOO), ("Bar.ttl", BAR)]);

        let grouping = service(ws.path())
            .import_package(&zip, &ImportOptions::default())
            .unwrap();

        assert!(ws.path().join("org.acme/1.0.0/Foo.ttl").is_file());
        assert!(ws.path().join("org.acme/1.0.0/Bar.ttl").is_file());
        let versions = grouping.versions("org.acme").unwrap();
        assert_eq!(versions[0].files.len(), 2);
    }

    #[test]
    fn test_selected_members_only() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("Foo.ttl", FOO), ("Bar.ttl", BAR)]);

        service(ws.path())
            .import_package(&zip, &ImportOptions::default().with_selected(["Foo.ttl"]))
            .unwrap();

        assert!(ws.path().join("org.acme/1.0.0/Foo.ttl").is_file());
        assert!(!ws.path().join("org.acme/1.0.0/Bar.ttl").exists());
    }

    #[test]
    fn test_unknown_selected_member() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("Foo.ttl", FOO), ("Bar.ttl", BAR)]);
        let result = service(ws.path())
            .import_package(&zip, &ImportOptions::default().with_selected(["Nope.ttl"]));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unresolved_reference_fails_without_writing() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("Foo.ttl", FOO)]);
        let result = service(ws.path()).import_package(&zip, &ImportOptions::default());
        assert!(matches!(result, Err(Error::ResolutionError(_))));
        assert!(!ws.path().join("org.acme").exists());
    }

    #[test]
    fn test_empty_package() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("readme.txt", "hi")]);
        let result = service(ws.path()).import_package(&zip, &ImportOptions::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_validate_collects_per_file_errors() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[
            ("Foo.ttl", FOO),
            ("Broken.ttl", "@prefix : <urn:samm:org.acme:1.0.0#> .\n:X undefined:y :Z .\n"),
        ]);

        let report = service(ws.path()).validate_package(&zip).unwrap();

        assert_eq!(report.entries.len(), 2);
        let broken = report.entries.iter().find(|e| e.member == "Broken.ttl").unwrap();
        assert_eq!(broken.errors.len(), 1);
        assert!(broken.urn.is_none());

        let foo = report.entries.iter().find(|e| e.member == "Foo.ttl").unwrap();
        assert_eq!(foo.target.as_deref(), Some(ws.path().join("org.acme/1.0.0/Foo.ttl").as_path()));
        assert!(!foo.exists_in_workspace);

        let missing: Vec<String> = report.missing.iter().map(|m| m.urn.to_string()).collect();
        assert_eq!(missing, vec!["urn:samm:org.acme:1.0.0#Bar"]);
        assert_eq!(report.missing[0].referenced_by, vec!["Foo.ttl"]);
        assert_eq!(
            report.missing[0].expected_path.as_deref(),
            Some(ws.path().join("org.acme/1.0.0/Bar.ttl").as_path())
        );
        assert!(!report.is_importable());
    }

    #[test]
    fn test_validate_complete_package() {
        let ws = TempDir::new().unwrap();
        let zip = package(&[("Foo.ttl", FOO), ("Bar.ttl", BAR)]);
        let report = service(ws.path()).validate_package(&zip).unwrap();
        assert!(report.is_importable(), "{report:?}");
        assert!(report.existing().is_empty());
    }
}
