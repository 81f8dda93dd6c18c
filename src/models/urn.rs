//! Aspect Model URN parsing and handling.
//!
//! Every model element carries a semantic identity embedded in the document
//! content. The scheme is:
//!
//! ```text
//! urn:samm:{namespace}:{version}#{element}
//! ```
//!
//! Where:
//! - `namespace`: a dotted identifier such as `org.eclipse.example`
//! - `version`: a semantic version, `MAJOR.MINOR.PATCH`
//! - `element`: the element name (optional for namespace-level URNs)
//!
//! Documents written against the legacy meta model use the `urn:bamm:`
//! scheme, which is accepted when parsing and normalised to `urn:samm:`.
//!
//! # Examples
//!
//! ```
//! use aspect_workspace::models::ModelUrn;
//!
//! let urn = ModelUrn::parse("urn:samm:org.acme:1.0.0#Movement").unwrap();
//! assert_eq!(urn.namespace(), "org.acme");
//! assert_eq!(urn.version().to_string(), "1.0.0");
//! assert_eq!(urn.element(), Some("Movement"));
//!
//! let ns = ModelUrn::parse("urn:samm:org.acme:1.0.0#").unwrap();
//! assert!(ns.element().is_none());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URN prefix of the current scheme.
pub const SAMM_URN_PREFIX: &str = "urn:samm:";

/// URN prefix of the legacy scheme.
pub const BAMM_URN_PREFIX: &str = "urn:bamm:";

/// Namespaces owned by the meta model itself. These never identify
/// workspace documents.
pub const META_MODEL_NAMESPACES: &[&str] = &["org.eclipse.esmf.samm", "io.openmanufacturing"];

/// A semantic version of a model namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl ModelVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a `MAJOR.MINOR.PATCH` string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the string is not a three-part version.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidIdentity(format!(
                "version must have the form MAJOR.MINOR.PATCH: {s}"
            )));
        };

        let component = |c: &str| {
            c.parse::<u64>()
                .map_err(|_| Error::InvalidIdentity(format!("invalid version component '{c}' in {s}")))
        };

        Ok(Self::new(component(major)?, component(minor)?, component(patch)?))
    }

    /// Returns the next major version (`MAJOR+1.0.0`).
    #[must_use]
    pub const fn next_major(&self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ModelVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModelVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ModelVersion> for String {
    fn from(version: ModelVersion) -> Self {
        version.to_string()
    }
}

/// A parsed Aspect Model URN.
///
/// Identity is the immutable `(namespace, version, element)` triple. A URN
/// without an element names a whole namespace version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelUrn {
    namespace: String,
    version: ModelVersion,
    element: Option<String>,
}

impl ModelUrn {
    /// Creates a URN for an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the namespace or element name is malformed.
    pub fn new(
        namespace: impl Into<String>,
        version: ModelVersion,
        element: impl Into<String>,
    ) -> Result<Self> {
        let urn = Self {
            namespace: namespace.into(),
            version,
            element: Some(element.into()),
        };
        urn.check()?;
        Ok(urn)
    }

    /// Creates a namespace-level URN (no element).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the namespace is malformed.
    pub fn for_namespace(namespace: impl Into<String>, version: ModelVersion) -> Result<Self> {
        let urn = Self {
            namespace: namespace.into(),
            version,
            element: None,
        };
        urn.check()?;
        Ok(urn)
    }

    /// Parses a URN string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the string is not a valid model URN.
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(SAMM_URN_PREFIX)
            .or_else(|| s.strip_prefix(BAMM_URN_PREFIX))
            .ok_or_else(|| {
                Error::InvalidIdentity(format!("URN must start with '{SAMM_URN_PREFIX}': {s}"))
            })?;

        let (path, element) = match rest.split_once('#') {
            Some((path, element)) => (path, (!element.is_empty()).then(|| element.to_string())),
            None => (rest, None),
        };

        // Meta model URNs carry an extra segment (`org.eclipse.esmf.samm:meta-model:2.1.0`),
        // so the version is always the last `:` component.
        let (namespace, version) = path
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidIdentity(format!("URN has no version: {s}")))?;

        let urn = Self {
            namespace: namespace.to_string(),
            version: ModelVersion::parse(version)?,
            element,
        };
        urn.check()?;
        Ok(urn)
    }

    /// Tries to parse a string as a URN, returning `None` if it is not one.
    #[must_use]
    pub fn try_parse(s: &str) -> Option<Self> {
        Self::parse(s).ok()
    }

    fn check(&self) -> Result<()> {
        let valid_segment = |seg: &str| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };

        // Only meta model namespaces carry a `:` separated kind.
        let namespace_ok = if self.is_meta_model() {
            self.namespace
                .split(':')
                .all(|part| part.split('.').all(valid_segment))
        } else {
            self.namespace.split('.').all(valid_segment)
        };
        if !namespace_ok {
            return Err(Error::InvalidIdentity(format!(
                "invalid namespace '{}'",
                self.namespace
            )));
        }

        if let Some(element) = &self.element {
            let element_ok = element
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && element
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !element_ok {
                return Err(Error::InvalidIdentity(format!(
                    "invalid element name '{element}'"
                )));
            }
        }
        Ok(())
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the version.
    #[must_use]
    pub const fn version(&self) -> ModelVersion {
        self.version
    }

    /// Returns the element name, if this URN names an element.
    #[must_use]
    pub fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    /// Returns `true` if this URN belongs to the meta model rather than a workspace.
    #[must_use]
    pub fn is_meta_model(&self) -> bool {
        META_MODEL_NAMESPACES
            .iter()
            .any(|ns| self.namespace == *ns || self.namespace.starts_with(&format!("{ns}:")))
    }

    /// Returns the namespace-level URN (`urn:samm:ns:ver#`).
    #[must_use]
    pub fn namespace_urn(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            version: self.version,
            element: None,
        }
    }

    /// Returns the same URN at another version.
    #[must_use]
    pub fn with_version(&self, version: ModelVersion) -> Self {
        Self {
            namespace: self.namespace.clone(),
            version,
            element: self.element.clone(),
        }
    }

    /// Returns the same namespace and version with another element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the element name is malformed.
    pub fn with_element(&self, element: impl Into<String>) -> Result<Self> {
        Self::new(self.namespace.clone(), self.version, element)
    }

    /// Returns the `namespace:version` key used for grouping and reports.
    #[must_use]
    pub fn namespace_key(&self) -> String {
        format!("{}:{}", self.namespace, self.version)
    }
}

impl fmt::Display for ModelUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SAMM_URN_PREFIX}{}:{}#{}",
            self.namespace,
            self.version,
            self.element.as_deref().unwrap_or_default()
        )
    }
}

impl FromStr for ModelUrn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ModelUrn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelUrn {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
