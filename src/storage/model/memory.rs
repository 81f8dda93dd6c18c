//! In-memory model store.
//!
//! Useful for tests and previews that must not touch the workspace directory.

use super::ModelStore;
use crate::document::DocumentSource;
use crate::models::{MODEL_FILE_EXTENSION, ModelFile, ModelUrn, NamespaceGrouping};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Model store keeping document text in memory.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: RwLock<BTreeMap<ModelUrn, String>>,
}

impl InMemoryModelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.read().map_or(0, |models| models.len())
    }

    /// Returns `true` if no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_poisoned(operation: &str) -> Error {
        Error::OperationFailed {
            operation: operation.to_string(),
            cause: "Lock poisoned".to_string(),
        }
    }

    /// Virtual location mirroring the workspace layout.
    fn virtual_location(urn: &ModelUrn) -> Result<PathBuf> {
        let element = urn
            .element()
            .ok_or_else(|| Error::InvalidIdentity(format!("{urn} names no element")))?;
        Ok(PathBuf::from(urn.namespace())
            .join(urn.version().to_string())
            .join(format!("{element}.{MODEL_FILE_EXTENSION}")))
    }

    fn source(urn: &ModelUrn, content: &str) -> Result<DocumentSource> {
        Ok(DocumentSource::in_memory(content).with_location(Self::virtual_location(urn)?))
    }
}

impl ModelStore for InMemoryModelStore {
    fn get_model(&self, urn: &ModelUrn) -> Result<Option<DocumentSource>> {
        Self::virtual_location(urn)?;
        let models = self
            .models
            .read()
            .map_err(|_| Self::lock_poisoned("get_model"))?;
        models
            .get(urn)
            .map(|content| Self::source(urn, content))
            .transpose()
    }

    fn save_model(&self, urn: &ModelUrn, content: &str) -> Result<ModelFile> {
        let location = Self::virtual_location(urn)?;
        let mut models = self
            .models
            .write()
            .map_err(|_| Self::lock_poisoned("save_model"))?;
        models.insert(urn.clone(), content.to_string());

        let name = location
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(ModelFile::new(name).with_urn(urn.clone()))
    }

    fn delete_model(&self, urn: &ModelUrn) -> Result<bool> {
        let mut models = self
            .models
            .write()
            .map_err(|_| Self::lock_poisoned("delete_model"))?;
        Ok(models.remove(urn).is_some())
    }

    fn list_models(&self, namespace: &ModelUrn) -> Result<Vec<DocumentSource>> {
        let models = self
            .models
            .read()
            .map_err(|_| Self::lock_poisoned("list_models"))?;
        models
            .iter()
            .filter(|(urn, _)| {
                urn.namespace() == namespace.namespace() && urn.version() == namespace.version()
            })
            .map(|(urn, content)| Self::source(urn, content))
            .collect()
    }

    fn list_namespaces(&self) -> Result<NamespaceGrouping> {
        let models = self
            .models
            .read()
            .map_err(|_| Self::lock_poisoned("list_namespaces"))?;
        Ok(NamespaceGrouping::from_files(models.keys().filter_map(|urn| {
            let element = urn.element()?;
            Some(ModelFile::new(format!("{element}.{MODEL_FILE_EXTENSION}")).with_urn(urn.clone()))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_listing() {
        let store = InMemoryModelStore::new();
        let a = ModelUrn::parse("urn:samm:org.acme:1.0.0#A").unwrap();
        let b = ModelUrn::parse("urn:samm:org.acme:2.0.0#B").unwrap();

        store.save_model(&a, "a").unwrap();
        store.save_model(&b, "b").unwrap();
        assert_eq!(store.len(), 2);

        let source = store.get_model(&a).unwrap().unwrap();
        assert_eq!(source.content, "a");
        assert_eq!(source.file_name(), Some("A.ttl"));

        let v1 = store.list_models(&a.namespace_urn()).unwrap();
        assert_eq!(v1.len(), 1);

        let grouping = store.list_namespaces().unwrap();
        assert_eq!(grouping.versions("org.acme").unwrap().len(), 2);

        assert!(store.delete_model(&a).unwrap());
        assert!(!store.model_exists(&a).unwrap());
    }

    #[test]
    fn test_namespace_urn_is_rejected() {
        let store = InMemoryModelStore::new();
        let ns = ModelUrn::parse("urn:samm:org.acme:1.0.0#").unwrap();
        assert!(matches!(
            store.save_model(&ns, "x"),
            Err(Error::InvalidIdentity(_))
        ));
    }
}
