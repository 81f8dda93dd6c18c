//! Filesystem-backed model store.
//!
//! Documents live in the workspace directory at
//! `{root}/{namespace}/{version}/{element}.ttl`.

use super::ModelStore;
use crate::document::DocumentSource;
use crate::models::{ModelFile, ModelUrn, ModelVersion, NamespaceGrouping, is_model_file};
use crate::services::PathResolver;
use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Model store over a workspace directory.
#[derive(Debug, Clone)]
pub struct FilesystemModelStore {
    resolver: PathResolver,
}

impl FilesystemModelStore {
    /// Creates a store rooted at a workspace directory.
    ///
    /// The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            resolver: PathResolver::new(root),
        }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    fn element_path(&self, urn: &ModelUrn) -> Result<PathBuf> {
        self.resolver.for_urn(urn)
    }

    fn describe(&self, path: &Path) -> ModelFile {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let mut file = ModelFile::new(name).with_location(path);
        if let Some((namespace, version, file_name)) = self.resolver.identity_from_path(path) {
            let stem = file_name
                .rsplit_once('.')
                .map_or(file_name.as_str(), |(stem, _)| stem);
            let urn = ModelUrn::new(namespace.as_str(), version, stem)
                .or_else(|_| ModelUrn::for_namespace(namespace.as_str(), version));
            if let Ok(urn) = urn {
                file = file.with_urn(urn);
            }
        }
        file
    }
}

impl ModelStore for FilesystemModelStore {
    fn get_model(&self, urn: &ModelUrn) -> Result<Option<DocumentSource>> {
        let path = self.element_path(urn)?;
        if !path.is_file() {
            return Ok(None);
        }
        DocumentSource::from_path(path).map(Some)
    }

    fn save_model(&self, urn: &ModelUrn, content: &str) -> Result<ModelFile> {
        let path = self.element_path(urn)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_model_dir".to_string(),
                cause: e.to_string(),
            })?;
        }
        fs::write(&path, content).map_err(|e| Error::OperationFailed {
            operation: "write_model_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        tracing::debug!(urn = %urn, path = %path.display(), "Saved model");
        Ok(self.describe(&path))
    }

    fn delete_model(&self, urn: &ModelUrn) -> Result<bool> {
        let path = self.element_path(urn)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::OperationFailed {
                operation: "delete_model_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            }),
        }
    }

    fn list_models(&self, namespace: &ModelUrn) -> Result<Vec<DocumentSource>> {
        let dir = self
            .resolver
            .version_dir(namespace.namespace(), namespace.version());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::operation("list_models", format!("{}: {e}", dir.display()))),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_model_file(path))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .filter_map(|path| match DocumentSource::from_path(path) {
                Ok(source) => Some(source),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable model file");
                    None
                },
            })
            .collect())
    }

    fn list_namespaces(&self) -> Result<NamespaceGrouping> {
        let files = walk_model_files(self.root())?;
        Ok(NamespaceGrouping::from_files(
            files.iter().map(|path| self.describe(path)),
        ))
    }
}

/// Enumerates `<root>/<namespace>/<version>/*.ttl`, sorted.
///
/// Hidden entries and directories that are not versions are skipped. A
/// missing root is an empty workspace.
///
/// # Errors
///
/// Returns an error if an existing directory cannot be read.
pub fn walk_model_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }

    for namespace_dir in read_dirs(root)? {
        for version_dir in read_dirs(&namespace_dir)? {
            let is_version = version_dir
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| ModelVersion::parse(n).is_ok());
            if !is_version {
                continue;
            }
            for entry in read_entries(&version_dir)? {
                if entry.is_file() && is_model_file(&entry) {
                    files.push(entry);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Recursively collects every model file beneath `root`, sorted.
///
/// Hidden files and directories are skipped.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn collect_model_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.exists() {
        collect_into(root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in read_entries(dir)? {
        if entry.is_dir() {
            collect_into(&entry, files)?;
        } else if is_model_file(&entry) {
            files.push(entry);
        }
    }
    Ok(())
}

fn read_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect())
}

/// Lists non-hidden entries of a directory.
fn read_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::operation("read_workspace_dir", format!("{}: {e}", dir.display())))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::operation("read_workspace_dir", format!("{}: {e}", dir.display())))?;
        let hidden = entry.file_name().to_str().is_none_or(|n| n.starts_with('.'));
        if !hidden {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FOO: &str = "@prefix : <urn:samm:org.acme:1.0.0#> .\n:Foo :p \"x\" .\n";

    fn urn(s: &str) -> ModelUrn {
        ModelUrn::parse(s).unwrap()
    }

    #[test]
    fn test_save_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemModelStore::new(dir.path());
        let foo = urn("urn:samm:org.acme:1.0.0#Foo");

        assert!(!store.model_exists(&foo).unwrap());
        let file = store.save_model(&foo, FOO).unwrap();
        assert_eq!(file.name, "Foo.ttl");
        assert_eq!(
            file.location.unwrap(),
            dir.path().join("org.acme").join("1.0.0").join("Foo.ttl")
        );

        let source = store.get_model(&foo).unwrap().unwrap();
        assert_eq!(source.content, FOO);

        assert!(store.delete_model(&foo).unwrap());
        assert!(!store.delete_model(&foo).unwrap());
    }

    #[test]
    fn test_get_model_requires_element() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemModelStore::new(dir.path());
        let ns = urn("urn:samm:org.acme:1.0.0#");
        assert!(matches!(store.get_model(&ns), Err(Error::InvalidIdentity(_))));
    }

    #[test]
    fn test_list_namespaces_skips_foreign_entries() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemModelStore::new(dir.path());
        store.save_model(&urn("urn:samm:org.acme:1.0.0#Foo"), FOO).unwrap();
        store.save_model(&urn("urn:samm:org.acme:2.0.0#Foo"), FOO).unwrap();
        store.save_model(&urn("urn:samm:com.other:1.0.0#Bar"), FOO).unwrap();

        fs::create_dir_all(dir.path().join(".git").join("1.0.0")).unwrap();
        fs::write(dir.path().join(".git").join("1.0.0").join("X.ttl"), "").unwrap();
        fs::create_dir_all(dir.path().join("org.acme").join("drafts")).unwrap();
        fs::write(dir.path().join("org.acme").join("drafts").join("Y.ttl"), "").unwrap();
        fs::write(dir.path().join("org.acme").join("1.0.0").join("notes.txt"), "").unwrap();

        let grouping = store.list_namespaces().unwrap();
        assert_eq!(grouping.files().count(), 3);
        assert_eq!(grouping.namespaces().collect::<Vec<_>>(), vec!["com.other", "org.acme"]);
        assert_eq!(grouping.versions("org.acme").unwrap().len(), 2);
    }

    #[test]
    fn test_list_models_of_version() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemModelStore::new(dir.path());
        store.save_model(&urn("urn:samm:org.acme:1.0.0#Foo"), FOO).unwrap();
        store.save_model(&urn("urn:samm:org.acme:1.0.0#Bar"), FOO).unwrap();

        let models = store.list_models(&urn("urn:samm:org.acme:1.0.0#")).unwrap();
        assert_eq!(models.len(), 2);
        assert!(store.list_models(&urn("urn:samm:org.acme:3.0.0#")).unwrap().is_empty());
    }

    #[test]
    fn test_list_models_skips_unreadable_files() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemModelStore::new(dir.path());
        store.save_model(&urn("urn:samm:org.acme:1.0.0#Foo"), FOO).unwrap();
        fs::write(
            dir.path().join("org.acme/1.0.0/Broken.ttl"),
            [0xff, 0xfe, 0x00, 0x9f],
        )
        .unwrap();

        let models = store.list_models(&urn("urn:samm:org.acme:1.0.0#")).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].content, FOO);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(walk_model_files(&dir.path().join("absent")).unwrap().is_empty());
        assert!(collect_model_files(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_collect_model_files_recurses() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b")).unwrap();
        fs::write(dir.path().join("a").join("b").join("X.ttl"), "").unwrap();
        fs::write(dir.path().join("Top.ttl"), "").unwrap();
        fs::write(dir.path().join("backup.zip"), "").unwrap();

        let files = collect_model_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
