//! Archive entry validation.
//!
//! Every entry name is checked before any byte of the archive is written:
//!
//! 1. Names that resolve outside the destination root, or are absolute, are
//!    rejected with [`Error::SecurityViolation`] (zip-slip).
//! 2. Platform housekeeping entries (`__MACOSX/`, `.DS_Store`, ...) are skipped.
//! 3. Names with characters outside `[A-Za-z0-9_-./]` or reserved device names
//!    are rejected with [`Error::FileNameError`].

use crate::{Error, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Allowed characters of an entry name.
static ALLOWED_ENTRY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-./]+$").unwrap_or_else(|_| unreachable!()));

/// Directory prefixes written by desktop archivers.
const HOUSEKEEPING_DIRS: &[&str] = &["__MACOSX"];

/// File names written by desktop file managers.
const HOUSEKEEPING_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Reserved device names on Windows.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// What to do with an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDisposition {
    /// Write the entry at this path relative to the destination.
    Extract(PathBuf),
    /// Directory entry; directories are created on demand.
    Directory,
    /// Housekeeping entry, ignored.
    Skip,
}

/// Validates archive entry names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryValidator;

impl EntryValidator {
    /// Classifies an entry name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecurityViolation`] for names escaping the root and
    /// [`Error::FileNameError`] for disallowed characters.
    pub fn classify(&self, name: &str) -> Result<EntryDisposition> {
        let segments = normalize(name)?;

        if is_housekeeping(&segments) {
            tracing::debug!(entry = name, "Skipping housekeeping archive entry");
            return Ok(EntryDisposition::Skip);
        }

        if segments.is_empty() {
            return Ok(EntryDisposition::Directory);
        }

        if name.chars().any(char::is_control) || !ALLOWED_ENTRY_NAME.is_match(name) {
            return Err(Error::FileNameError(name.to_string()));
        }

        if segments.last().is_some_and(|s| is_reserved(s)) {
            return Err(Error::FileNameError(format!("{name} uses a reserved device name")));
        }

        if name.ends_with('/') {
            return Ok(EntryDisposition::Directory);
        }

        Ok(EntryDisposition::Extract(segments.iter().collect()))
    }
}

/// Lexically resolves an entry name against the destination root.
fn normalize(name: &str) -> Result<Vec<&str>> {
    let absolute = name.starts_with('/')
        || name.starts_with('\\')
        || (name.len() > 1 && name.as_bytes()[1] == b':');
    if absolute {
        tracing::warn!(entry = name, "Absolute path in archive");
        return Err(Error::SecurityViolation(format!(
            "archive entry {name} is an absolute path"
        )));
    }

    let mut segments = Vec::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    tracing::warn!(entry = name, "Path traversal in archive");
                    return Err(Error::SecurityViolation(format!(
                        "archive entry {name} escapes the extraction root"
                    )));
                }
            },
            other => segments.push(other),
        }
    }
    Ok(segments)
}

fn is_housekeeping(segments: &[&str]) -> bool {
    let in_housekeeping_dir = segments
        .first()
        .is_some_and(|first| HOUSEKEEPING_DIRS.contains(first));
    let housekeeping_file = segments
        .last()
        .is_some_and(|last| HOUSEKEEPING_FILES.contains(last) || last.starts_with("._"));
    in_housekeeping_dir || housekeeping_file
}

/// Checks whether a file name's stem is a device name.
fn is_reserved(file_name: &str) -> bool {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
}
