//! Model file descriptors.

use super::ModelUrn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File extension of Aspect Model documents.
pub const MODEL_FILE_EXTENSION: &str = "ttl";

/// A model document as seen by the workspace.
///
/// The location is absent for transient documents that only exist in memory
/// (for example while a package is being exported).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFile {
    /// File name including extension (`Movement.ttl`).
    pub name: String,
    /// Semantic identity of the document, if one could be discovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<ModelUrn>,
    /// On-disk location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
    /// Leading comment lines of the document (copyright and license headers).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<String>,
}

impl ModelFile {
    /// Creates a descriptor with just a file name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            urn: None,
            location: None,
            header: Vec::new(),
        }
    }

    /// Sets the semantic identity.
    #[must_use]
    pub fn with_urn(mut self, urn: ModelUrn) -> Self {
        self.urn = Some(urn);
        self
    }

    /// Sets the on-disk location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the header lines.
    #[must_use]
    pub fn with_header(mut self, header: Vec<String>) -> Self {
        self.header = header;
        self
    }

    /// Returns the file stem (`Movement` for `Movement.ttl`).
    #[must_use]
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(&format!(".{MODEL_FILE_EXTENSION}"))
            .unwrap_or(&self.name)
    }
}

/// Returns `true` if the path names an Aspect Model document.
#[must_use]
pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_FILE_EXTENSION))
}
