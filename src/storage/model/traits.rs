//! Model store trait definition.

use crate::Result;
use crate::document::DocumentSource;
use crate::models::{ModelFile, ModelUrn, NamespaceGrouping};

/// Trait for namespace-scoped model storage.
///
/// Documents are addressed by element URN; a store keeps at most one document
/// per `(namespace, version, element)`.
pub trait ModelStore: Send + Sync {
    /// Gets the document stored for an element.
    ///
    /// # Arguments
    ///
    /// * `urn` - Element URN
    ///
    /// # Returns
    ///
    /// The document source if found, None otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidIdentity`] if the URN names no element, or
    /// an error if the store cannot be read.
    fn get_model(&self, urn: &ModelUrn) -> Result<Option<DocumentSource>>;

    /// Saves document content for an element, replacing any existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the URN names no element or the write fails.
    fn save_model(&self, urn: &ModelUrn, content: &str) -> Result<ModelFile>;

    /// Deletes the document stored for an element.
    ///
    /// # Returns
    ///
    /// True if deleted, false if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    fn delete_model(&self, urn: &ModelUrn) -> Result<bool>;

    /// Lists every document of one namespace version.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_models(&self, namespace: &ModelUrn) -> Result<Vec<DocumentSource>>;

    /// Groups every stored document by namespace and version.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_namespaces(&self) -> Result<NamespaceGrouping>;

    /// Returns `true` if a document is stored for the element.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn model_exists(&self, urn: &ModelUrn) -> Result<bool> {
        Ok(self.get_model(urn)?.is_some())
    }
}
