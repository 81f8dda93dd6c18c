//! Canonical workspace paths for model files.
//!
//! Every model file lives at:
//!
//! ```text
//! <root>/<namespace>/<version>/<file name>
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use aspect_workspace::PathResolver;
//!
//! let resolver = PathResolver::new("/home/user/aspect-models");
//! let urn = ModelUrn::parse("urn:samm:org.acme:1.0.0#Movement")?;
//! assert_eq!(
//!     resolver.for_urn(&urn)?,
//!     PathBuf::from("/home/user/aspect-models/org.acme/1.0.0/Movement.ttl"),
//! );
//! ```

use crate::document::ParsedDocument;
use crate::models::{MODEL_FILE_EXTENSION, ModelUrn, ModelVersion};
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Derives canonical file locations from semantic identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for a workspace root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `<namespace>/<version>/<file_name>` relative to the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if any component is empty or would
    /// leave its directory level.
    pub fn relative_path(&self, namespace: &str, version: ModelVersion, file_name: &str) -> Result<PathBuf> {
        for (label, part) in [("namespace", namespace), ("file name", file_name)] {
            if !is_single_component(part) {
                return Err(Error::InvalidIdentity(format!(
                    "{label} '{part}' is not a single path component"
                )));
            }
        }
        Ok(PathBuf::from(namespace)
            .join(version.to_string())
            .join(file_name))
    }

    /// Returns the absolute path for `(namespace, version, file_name)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if a component is malformed.
    pub fn resolve(&self, namespace: &str, version: ModelVersion, file_name: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(self.relative_path(namespace, version, file_name)?))
    }

    /// Returns the directory holding one namespace version.
    #[must_use]
    pub fn version_dir(&self, namespace: &str, version: ModelVersion) -> PathBuf {
        self.root.join(namespace).join(version.to_string())
    }

    /// Returns the path of the file named after the URN's element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the URN names no element.
    pub fn for_urn(&self, urn: &ModelUrn) -> Result<PathBuf> {
        let element = urn
            .element()
            .ok_or_else(|| Error::InvalidIdentity(format!("{urn} names no element")))?;
        self.resolve(
            urn.namespace(),
            urn.version(),
            &format!("{element}.{MODEL_FILE_EXTENSION}"),
        )
    }

    /// Returns the canonical path of a parsed document.
    ///
    /// The document's own file name is kept; namespace and version come from
    /// its identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if no identity is discoverable.
    pub fn for_document(&self, document: &ParsedDocument) -> Result<PathBuf> {
        Ok(self.root.join(self.relative_for_document(document)?))
    }

    /// Returns the canonical path of a parsed document relative to the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if no identity is discoverable.
    pub fn relative_for_document(&self, document: &ParsedDocument) -> Result<PathBuf> {
        let urn = document.urn()?;
        self.relative_path(urn.namespace(), urn.version(), &document.file_name()?)
    }

    /// Returns the `/` separated archive entry name for a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if no identity is discoverable.
    pub fn package_path(&self, document: &ParsedDocument) -> Result<String> {
        let urn = document.urn()?;
        Ok(format!(
            "{}/{}/{}",
            urn.namespace(),
            urn.version(),
            document.file_name()?
        ))
    }

    /// Reads `(namespace, version, file name)` back from a path under the root.
    ///
    /// Returns `None` for paths outside the fixed three-level layout.
    #[must_use]
    pub fn identity_from_path(&self, path: &Path) -> Option<(String, ModelVersion, String)> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        let [namespace, version, file] = parts.as_slice() else {
            return None;
        };
        let version = ModelVersion::parse(version).ok()?;
        Some(((*namespace).to_string(), version, (*file).to_string()))
    }
}

fn is_single_component(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains(['/', '\\'])
        && matches!(
            Path::new(part).components().next(),
            Some(Component::Normal(_))
        )
}
