//! Namespace groupings of model files.
//!
//! A grouping is derived per request from a set of model files and never
//! persisted:
//!
//! ```text
//! {
//!   "org.acme": [ { "version": "1.0.0", "files": [ ... ] } ]
//! }
//! ```

use super::{ModelFile, ModelVersion};
use serde::Serialize;
use std::collections::BTreeMap;

/// Model files sharing one namespace and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionGroup {
    /// Namespace version.
    pub version: ModelVersion,
    /// Files in insertion order.
    pub files: Vec<ModelFile>,
}

/// Mapping of namespace to its version groups.
///
/// Namespaces and versions are kept sorted, so two groupings built from the
/// same files compare equal regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NamespaceGrouping {
    namespaces: BTreeMap<String, Vec<VersionGroup>>,
}

impl NamespaceGrouping {
    /// Creates an empty grouping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a grouping from files. Files without an identity are skipped.
    #[must_use]
    pub fn from_files(files: impl IntoIterator<Item = ModelFile>) -> Self {
        let mut grouping = Self::new();
        for file in files {
            grouping.insert(file);
        }
        grouping
    }

    /// Adds a file under its namespace and version.
    ///
    /// Returns `false` if the file has no identity or a file of the same name
    /// is already present in that version group.
    pub fn insert(&mut self, file: ModelFile) -> bool {
        let Some(urn) = file.urn.as_ref() else {
            tracing::debug!(file = %file.name, "Skipping file without identity in grouping");
            return false;
        };
        let version = urn.version();
        let groups = self
            .namespaces
            .entry(urn.namespace().to_string())
            .or_default();

        let index = match groups.binary_search_by(|g| g.version.cmp(&version)) {
            Ok(index) => index,
            Err(index) => {
                groups.insert(
                    index,
                    VersionGroup {
                        version,
                        files: Vec::new(),
                    },
                );
                index
            },
        };

        let group = &mut groups[index];
        if group.files.iter().any(|f| f.name == file.name) {
            return false;
        }
        group.files.push(file);
        true
    }

    /// Returns the version groups of a namespace.
    #[must_use]
    pub fn versions(&self, namespace: &str) -> Option<&[VersionGroup]> {
        self.namespaces.get(namespace).map(Vec::as_slice)
    }

    /// Iterates namespaces in sorted order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Iterates all files.
    pub fn files(&self) -> impl Iterator<Item = &ModelFile> {
        self.namespaces
            .values()
            .flatten()
            .flat_map(|group| group.files.iter())
    }

    /// Number of namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Returns `true` if the grouping holds no namespaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelUrn;

    fn file(urn: &str) -> ModelFile {
        let urn = ModelUrn::parse(urn).unwrap();
        let name = format!("{}.ttl", urn.element().unwrap_or("unnamed"));
        ModelFile::new(name).with_urn(urn)
    }

    #[test]
    fn test_groups_by_namespace_and_version() {
        let grouping = NamespaceGrouping::from_files([
            file("urn:samm:ns:1.0.0#A"),
            file("urn:samm:ns:2.0.0#A"),
            file("urn:samm:ns:1.0.0#B"),
        ]);

        let versions = grouping.versions("ns").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version.to_string(), "1.0.0");
        assert_eq!(versions[0].files.len(), 2);
        assert_eq!(versions[1].version.to_string(), "2.0.0");
    }

    #[test]
    fn test_skips_files_without_identity() {
        let mut grouping = NamespaceGrouping::new();
        assert!(!grouping.insert(ModelFile::new("orphan.ttl")));
        assert!(grouping.is_empty());
    }

    #[test]
    fn test_duplicate_file_ignored() {
        let mut grouping = NamespaceGrouping::new();
        assert!(grouping.insert(file("urn:samm:ns:1.0.0#A")));
        assert!(!grouping.insert(file("urn:samm:ns:1.0.0#A")));
        assert_eq!(grouping.files().count(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let grouping = NamespaceGrouping::from_files([file("urn:samm:acme:1.0.0#Foo")]);
        let json = serde_json::to_value(&grouping).unwrap();
        assert_eq!(json["acme"][0]["version"], "1.0.0");
        assert_eq!(json["acme"][0]["files"][0]["name"], "Foo.ttl");
    }
}
