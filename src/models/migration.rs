//! Workspace migration reports.

use serde::Serialize;
use std::collections::BTreeMap;

/// What happened to a single file during migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// The document was rewritten in place.
    Upgraded,
    /// The document was already current; nothing was written.
    Unchanged,
    /// The document was written to the next major version directory.
    Relocated,
    /// A file of the same name already exists at the bumped location.
    Conflict,
    /// Reading, upgrading or writing the document failed.
    Failed,
}

impl FileStatus {
    /// Returns `true` for outcomes that count as errors.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Conflict | Self::Failed)
    }

    /// Returns `true` for outcomes that changed the workspace.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Upgraded | Self::Relocated)
    }

    /// Returns the status as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upgraded => "upgraded",
            Self::Unchanged => "unchanged",
            Self::Relocated => "relocated",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of migrating one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// File name within its version directory.
    pub file_name: String,
    /// Whether the file migrated without error.
    pub success: bool,
    /// What happened.
    pub status: FileStatus,
    /// Human-readable detail.
    pub message: String,
}

impl FileOutcome {
    /// Creates an outcome; success is derived from the status.
    #[must_use]
    pub fn new(file_name: impl Into<String>, status: FileStatus, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            success: !status.is_error(),
            status,
            message: message.into(),
        }
    }
}

/// Result of migrating a whole workspace.
///
/// Outcomes are keyed by `namespace:version` and kept in walk order within
/// each key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// `true` only if no file recorded an error.
    pub success: bool,
    /// Per `namespace:version` outcomes.
    pub namespaces: BTreeMap<String, Vec<FileOutcome>>,
}

impl MigrationResult {
    /// Creates an empty, successful result.
    #[must_use]
    pub fn new() -> Self {
        Self {
            success: true,
            namespaces: BTreeMap::new(),
        }
    }

    /// Records an outcome under a `namespace:version` key.
    pub fn record(&mut self, key: impl Into<String>, outcome: FileOutcome) {
        if !outcome.success {
            self.success = false;
        }
        self.namespaces.entry(key.into()).or_default().push(outcome);
    }

    /// Iterates all outcomes.
    pub fn outcomes(&self) -> impl Iterator<Item = &FileOutcome> {
        self.namespaces.values().flatten()
    }

    /// Number of files that changed the workspace.
    #[must_use]
    pub fn changed_files(&self) -> usize {
        self.outcomes().filter(|o| o.status.is_change()).count()
    }

    /// Number of files that recorded an error.
    #[must_use]
    pub fn failed_files(&self) -> usize {
        self.outcomes().filter(|o| !o.success).count()
    }

    /// Total number of files visited.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.outcomes().count()
    }
}
