//! Document collaborators.
//!
//! Parsing, validating, upgrading and serializing Aspect Model documents is
//! the job of an external model library. The workspace consumes it through
//! four narrow traits:
//!
//! | Trait | Contract |
//! |-------|----------|
//! | [`DocumentLoader`] | parse sources, load sets with references resolved |
//! | [`DocumentValidator`] | report violations for a loaded set |
//! | [`DocumentUpgrader`] | idempotent meta model upgrade, namespace rebasing |
//! | [`DocumentSerializer`] | write a document, overwriting the destination |
//!
//! [`TurtleDocuments`] implements all four with a lightweight textual reader
//! that understands prefix directives and statement subjects, which is enough
//! to discover identities and references without a full RDF stack.

mod turtle;

pub use turtle::{CURRENT_META_MODEL_VERSION, TurtleDocuments};

use crate::models::{ModelFile, ModelUrn};
use crate::storage::ModelStore;
use crate::{Error, Result};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// Raw document content plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    /// On-disk location, absent for in-memory documents.
    pub location: Option<PathBuf>,
    /// Document text.
    pub content: String,
}

impl DocumentSource {
    /// Creates an in-memory source.
    #[must_use]
    pub fn in_memory(content: impl Into<String>) -> Self {
        Self {
            location: None,
            content: content.into(),
        }
    }

    /// Reads a source from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not UTF-8.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
            operation: "read_model_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Ok(Self {
            location: Some(path),
            content,
        })
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Returns the file name of the location, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.location
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }
}

/// A parsed model document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub(crate) source: DocumentSource,
    pub(crate) namespace: Option<ModelUrn>,
    pub(crate) defined: Vec<ModelUrn>,
    pub(crate) references: BTreeSet<ModelUrn>,
    pub(crate) meta_model: Option<ModelUrn>,
    pub(crate) header: Vec<String>,
}

impl ParsedDocument {
    /// Returns the document text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.source.content
    }

    /// Returns the on-disk location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.source.location.as_deref()
    }

    /// Returns the underlying source.
    #[must_use]
    pub const fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Returns the document with another location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.source.location = Some(location.into());
        self
    }

    /// Returns the namespace-level identity (`urn:samm:ns:ver#`).
    #[must_use]
    pub const fn namespace(&self) -> Option<&ModelUrn> {
        self.namespace.as_ref()
    }

    /// Returns the elements this document defines.
    #[must_use]
    pub fn defined_elements(&self) -> &[ModelUrn] {
        &self.defined
    }

    /// Returns the elements this document references but does not define.
    #[must_use]
    pub const fn references(&self) -> &BTreeSet<ModelUrn> {
        &self.references
    }

    /// Returns the meta model namespace the document is written against.
    #[must_use]
    pub const fn meta_model(&self) -> Option<&ModelUrn> {
        self.meta_model.as_ref()
    }

    /// Returns the leading comment lines.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns `true` if the document defines the element.
    #[must_use]
    pub fn defines(&self, urn: &ModelUrn) -> bool {
        self.defined.iter().any(|d| d == urn)
    }

    /// Returns the document's semantic identity.
    ///
    /// The element is the defined element matching the file stem, or the first
    /// element defined in the document's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if no identity is discoverable.
    pub fn urn(&self) -> Result<ModelUrn> {
        let namespace = self.namespace.as_ref().ok_or_else(|| {
            Error::InvalidIdentity(format!("no model namespace declared in {}", self.describe()))
        })?;

        let in_namespace = |urn: &&ModelUrn| {
            urn.namespace() == namespace.namespace() && urn.version() == namespace.version()
        };

        let stem = self
            .source
            .file_name()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem));

        let by_stem = stem.and_then(|stem| {
            self.defined
                .iter()
                .filter(in_namespace)
                .find(|urn| urn.element() == Some(stem))
        });

        by_stem
            .or_else(|| self.defined.iter().find(in_namespace))
            .cloned()
            .ok_or_else(|| {
                Error::InvalidIdentity(format!(
                    "{} defines no element in {namespace}",
                    self.describe()
                ))
            })
    }

    /// Returns the file name used for this document in the workspace.
    ///
    /// The source file name is kept when there is one; otherwise the
    /// element name with the model file extension is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if there is no file name and no identity.
    pub fn file_name(&self) -> Result<String> {
        if let Some(name) = self.source.file_name() {
            return Ok(name.to_string());
        }
        let urn = self.urn()?;
        let element = urn
            .element()
            .ok_or_else(|| Error::InvalidIdentity(format!("{urn} names no element")))?;
        Ok(format!("{element}.{}", crate::models::MODEL_FILE_EXTENSION))
    }

    /// Builds a file descriptor for grouping and reports.
    #[must_use]
    pub fn to_model_file(&self) -> ModelFile {
        let name = self
            .file_name()
            .unwrap_or_else(|_| self.describe());
        let mut file = ModelFile::new(name).with_header(self.header.clone());
        if let Ok(urn) = self.urn() {
            file = file.with_urn(urn);
        }
        if let Some(location) = self.location() {
            file = file.with_location(location);
        }
        file
    }

    /// Short description for messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.source.location.as_ref().map_or_else(
            || "<in-memory document>".to_string(),
            |p| p.display().to_string(),
        )
    }
}

/// Documents loaded together, so references between them resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocumentSet {
    documents: Vec<ParsedDocument>,
}

impl ParsedDocumentSet {
    /// Creates a set from parsed documents.
    #[must_use]
    pub const fn new(documents: Vec<ParsedDocument>) -> Self {
        Self { documents }
    }

    /// Iterates the documents in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedDocument> {
        self.documents.iter()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Adds a document.
    pub fn push(&mut self, document: ParsedDocument) {
        self.documents.push(document);
    }

    /// Returns the document defining `urn`, if loaded.
    #[must_use]
    pub fn find_definition(&self, urn: &ModelUrn) -> Option<&ParsedDocument> {
        self.documents.iter().find(|d| d.defines(urn))
    }

    /// Returns every reference no document in the set defines, paired with
    /// the referring document.
    #[must_use]
    pub fn unresolved_references(&self) -> Vec<(&ModelUrn, &ParsedDocument)> {
        self.documents
            .iter()
            .flat_map(|doc| doc.references.iter().map(move |r| (r, doc)))
            .filter(|(urn, _)| self.find_definition(urn).is_none())
            .collect()
    }

    /// Consumes the set.
    #[must_use]
    pub fn into_documents(self) -> Vec<ParsedDocument> {
        self.documents
    }
}

impl IntoIterator for ParsedDocumentSet {
    type Item = ParsedDocument;
    type IntoIter = std::vec::IntoIter<ParsedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParsedDocumentSet {
    type Item = &'a ParsedDocument;
    type IntoIter = std::slice::Iter<'a, ParsedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// Category of a validation violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The document is structurally broken.
    Syntax,
    /// A referenced element is not defined by any loaded document.
    Processing,
    /// The document is well-formed but semantically incomplete.
    Semantic,
}

/// A validation finding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Human-readable description.
    pub message: String,
    /// The element the violation is about.
    pub focus: Option<ModelUrn>,
    /// Violation category.
    pub kind: ViolationKind,
    /// Location of the offending document.
    pub location: Option<PathBuf>,
}

/// Loads model documents.
pub trait DocumentLoader: Send + Sync {
    /// Parses a single document without resolving references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionError`] if the document is syntactically invalid.
    fn parse(&self, source: DocumentSource) -> Result<ParsedDocument>;

    /// Loads sources as one set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionError`] on invalid syntax or when a reference
    /// is not defined by any document in the set.
    fn load(&self, sources: Vec<DocumentSource>) -> Result<ParsedDocumentSet> {
        let set = self.parse_all(sources)?;
        if let Some((urn, doc)) = set.unresolved_references().first() {
            return Err(Error::ResolutionError(format!(
                "{urn} referenced by {} is not defined",
                doc.describe()
            )));
        }
        Ok(set)
    }

    /// Loads sources as one set, resolving references the set does not define
    /// against an existing store. Store documents are not added to the set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionError`] on invalid syntax or when a reference
    /// is defined neither in the set nor in the store.
    fn load_with_store(
        &self,
        sources: Vec<DocumentSource>,
        store: &dyn ModelStore,
    ) -> Result<ParsedDocumentSet> {
        let set = self.parse_all(sources)?;
        for (urn, doc) in set.unresolved_references() {
            if locate_definition(self, store, urn)?.is_none() {
                return Err(Error::ResolutionError(format!(
                    "{urn} referenced by {} is not defined",
                    doc.describe()
                )));
            }
        }
        Ok(set)
    }

    /// Loads the documents defining `urns` from a store, following references
    /// transitively.
    ///
    /// Requested identities the store does not hold are skipped; the caller
    /// decides whether an empty set is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionError`] when a transitively referenced element
    /// cannot be found, or any store error.
    fn resolve(&self, urns: &[ModelUrn], store: &dyn ModelStore) -> Result<ParsedDocumentSet> {
        let mut set = ParsedDocumentSet::default();
        let mut queue: VecDeque<(ModelUrn, bool)> =
            urns.iter().cloned().map(|urn| (urn, true)).collect();
        let mut seen = BTreeSet::new();

        while let Some((urn, requested)) = queue.pop_front() {
            if !seen.insert(urn.clone()) || set.find_definition(&urn).is_some() {
                continue;
            }
            let Some(doc) = locate_definition(self, store, &urn)? else {
                if requested {
                    tracing::warn!(urn = %urn, "Requested model not found in store");
                    continue;
                }
                return Err(Error::ResolutionError(format!(
                    "referenced element {urn} not found in workspace"
                )));
            };
            for reference in doc.references() {
                queue.push_back((reference.clone(), false));
            }
            set.push(doc);
        }

        Ok(set)
    }

    /// Parses every source; the first syntax error aborts.
    ///
    /// # Errors
    ///
    /// Returns the first parse error.
    fn parse_all(&self, sources: Vec<DocumentSource>) -> Result<ParsedDocumentSet> {
        sources
            .into_iter()
            .map(|source| self.parse(source))
            .collect::<Result<Vec<_>>>()
            .map(ParsedDocumentSet::new)
    }
}

/// Validates loaded document sets.
pub trait DocumentValidator: Send + Sync {
    /// Returns all violations found in the set; an empty list means valid.
    fn validate(&self, set: &ParsedDocumentSet) -> Vec<Violation>;
}

/// Upgrades documents to the current meta model.
pub trait DocumentUpgrader: Send + Sync {
    /// Upgrades a document. Upgrading a current document returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] if the document's meta model
    /// version cannot be upgraded.
    fn upgrade(&self, document: ParsedDocument) -> Result<ParsedDocument>;

    /// Rewrites the document's own namespace to another version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the document has no namespace.
    fn rebase(
        &self,
        document: ParsedDocument,
        version: crate::models::ModelVersion,
    ) -> Result<ParsedDocument>;
}

/// Serializes documents.
pub trait DocumentSerializer: Send + Sync {
    /// Serializes a document to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_bytes(&self, document: &ParsedDocument) -> Result<Vec<u8>>;

    /// Writes a document, overwriting the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    fn write(&self, document: &ParsedDocument, destination: &Path) -> Result<()> {
        let bytes = self.to_bytes(document)?;
        std::fs::write(destination, bytes).map_err(|e| Error::OperationFailed {
            operation: "write_model_file".to_string(),
            cause: format!("{}: {e}", destination.display()),
        })
    }
}

/// Finds and parses the document defining `urn` in a store.
///
/// Looks up `<ns>/<ver>/<element>.ttl` first, then scans the other documents
/// of that namespace version.
///
/// Documents that cannot be read or parsed are skipped.
///
/// # Errors
///
/// Returns an error if the namespace version cannot be listed.
pub fn locate_definition<L: DocumentLoader + ?Sized>(
    loader: &L,
    store: &dyn ModelStore,
    urn: &ModelUrn,
) -> Result<Option<ParsedDocument>> {
    match store
        .get_model(urn)
        .and_then(|source| source.map(|s| loader.parse(s)).transpose())
    {
        Ok(Some(doc)) if doc.defines(urn) => return Ok(Some(doc)),
        Ok(_) => {},
        Err(e) => tracing::warn!(error = %e, "Skipping unusable definition file of {urn}"),
    }

    for source in store.list_models(&urn.namespace_urn())? {
        match loader.parse(source) {
            Ok(doc) if doc.defines(urn) => return Ok(Some(doc)),
            Ok(_) => {},
            Err(e) => tracing::debug!(error = %e, "Skipping unparsable document while resolving {urn}"),
        }
    }
    Ok(None)
}
