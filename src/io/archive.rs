//! ZIP packaging of model files.
//!
//! A package is a ZIP archive whose entries are keyed by
//! `namespace/version/filename`. Packing writes every entry exactly once in
//! sorted order; unpacking validates every entry name and size before any
//! byte is written, so a rejected archive never leaves a partial tree behind.

use super::security::{EntryDisposition, EntryValidator};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Quotas applied while unpacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries (default 10000).
    pub max_entries: usize,
    /// Maximum uncompressed size per entry (default 32MB).
    pub max_entry_size: u64,
    /// Maximum total uncompressed size (default 512MB).
    pub max_total_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_entry_size: 32 * 1024 * 1024,
            max_total_size: 512 * 1024 * 1024,
        }
    }
}

impl ArchiveLimits {
    /// Sets the maximum number of entries.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the maximum uncompressed size per entry.
    #[must_use]
    pub const fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    /// Sets the maximum total uncompressed size.
    #[must_use]
    pub const fn with_max_total_size(mut self, max_total_size: u64) -> Self {
        self.max_total_size = max_total_size;
        self
    }
}

/// Builds and extracts model packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageArchiver {
    limits: ArchiveLimits,
    validator: EntryValidator,
}

impl PackageArchiver {
    /// Creates an archiver with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unpack limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ArchiveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the unpack limits.
    #[must_use]
    pub const fn limits(&self) -> &ArchiveLimits {
        &self.limits
    }

    /// Packs named contents into ZIP bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNameError`] or [`Error::SecurityViolation`] for entry
    /// names that could not be unpacked again, or an error if writing fails.
    pub fn pack(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        for name in entries.keys() {
            if !matches!(self.validator.classify(name)?, EntryDisposition::Extract(_)) {
                return Err(Error::FileNameError(format!("{name} is not a file entry")));
            }
        }
        Self::write_entries(entries)
    }

    /// Packs a snapshot of files already on disk.
    ///
    /// Unlike [`pack`](Self::pack), names outside the package character set
    /// are kept, so every file under a workspace can be captured. Entries
    /// escaping the archive root are still rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecurityViolation`] for escaping names, or an error if
    /// writing fails.
    pub fn pack_snapshot(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        for name in entries.keys() {
            match self.validator.classify(name) {
                Ok(EntryDisposition::Extract(_)) => {},
                Ok(_) => {
                    return Err(Error::FileNameError(format!("{name} is not a file entry")));
                },
                Err(Error::FileNameError(reason)) => {
                    tracing::warn!(
                        entry = name,
                        reason = %reason,
                        "Snapshot entry is not importable as a package member"
                    );
                },
                Err(e) => return Err(e),
            }
        }
        Self::write_entries(entries)
    }

    fn write_entries(entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, bytes) in entries {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::operation("pack_archive", format!("{name}: {e}")))?;
            zip.write_all(bytes)
                .map_err(|e| Error::operation("pack_archive", format!("{name}: {e}")))?;
        }

        zip.finish()
            .map_err(|e| Error::operation("pack_archive", e))?;

        tracing::debug!(entries = entries.len(), "Packed archive");
        Ok(buffer.into_inner())
    }

    /// Extracts ZIP bytes below `destination`.
    ///
    /// Returns the extracted file paths in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecurityViolation`] for entries escaping `destination`
    /// or exceeding the limits, [`Error::FileNameError`] for disallowed names,
    /// and [`Error::OperationFailed`] for corrupt archives or I/O failures.
    /// Validation errors are raised before anything is written.
    pub fn unpack(&self, bytes: &[u8], destination: &Path) -> Result<Vec<PathBuf>> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::operation("open_archive", e))?;

        if archive.len() > self.limits.max_entries {
            return Err(Error::SecurityViolation(format!(
                "archive contains {} entries, exceeds limit of {}",
                archive.len(),
                self.limits.max_entries
            )));
        }

        let plan = self.plan(&mut archive)?;

        let mut extracted = Vec::with_capacity(plan.len());
        for (index, relative) in plan {
            let target = destination.join(&relative);
            let mut entry = archive
                .by_index(index)
                .map_err(|e| Error::operation("read_archive_entry", e))?;

            let mut content = Vec::new();
            entry
                .by_ref()
                .take(self.limits.max_entry_size.saturating_add(1))
                .read_to_end(&mut content)
                .map_err(|e| Error::operation("read_archive_entry", format!("{}: {e}", relative.display())))?;
            if content.len() as u64 > self.limits.max_entry_size {
                return Err(Error::SecurityViolation(format!(
                    "entry {} exceeds size limit {}",
                    relative.display(),
                    self.limits.max_entry_size
                )));
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::operation("create_extract_dir", format!("{}: {e}", parent.display())))?;
            }
            fs::write(&target, &content)
                .map_err(|e| Error::operation("write_extracted_file", format!("{}: {e}", target.display())))?;
            extracted.push(target);
        }

        tracing::debug!(
            files = extracted.len(),
            destination = %destination.display(),
            "Unpacked archive"
        );
        Ok(extracted)
    }

    /// Validates every entry and returns the files to extract.
    fn plan<R: Read + std::io::Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<(usize, PathBuf)>> {
        let mut plan = Vec::new();
        let mut seen = HashSet::new();
        let mut total = 0u64;

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| Error::operation("read_archive_entry", e))?;
            let name = entry.name().to_string();
            let size = entry.size();
            let is_dir = entry.is_dir();
            drop(entry);

            let disposition = self.validator.classify(&name)?;
            let EntryDisposition::Extract(relative) = disposition else {
                continue;
            };
            if is_dir {
                continue;
            }

            if size > self.limits.max_entry_size {
                return Err(Error::SecurityViolation(format!(
                    "entry {name} size {size} exceeds limit {}",
                    self.limits.max_entry_size
                )));
            }
            total = total.saturating_add(size);
            if total > self.limits.max_total_size {
                return Err(Error::SecurityViolation(format!(
                    "archive exceeds total size limit {}",
                    self.limits.max_total_size
                )));
            }

            if !seen.insert(relative.clone()) {
                return Err(Error::FileNameError(format!(
                    "{name} duplicates entry {}",
                    relative.display()
                )));
            }
            plan.push((index, relative));
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        for (name, bytes) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_pack_unpack() {
        let mut entries = BTreeMap::new();
        entries.insert("org.acme/1.0.0/Foo.ttl".to_string(), b"foo".to_vec());
        entries.insert("org.acme/1.0.0/Bar.ttl".to_string(), b"bar".to_vec());

        let bytes = PackageArchiver::new().pack(&entries).unwrap();
        let dir = TempDir::new().unwrap();
        let files = PackageArchiver::new().unpack(&bytes, dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(
            fs::read(dir.path().join("org.acme/1.0.0/Foo.ttl")).unwrap(),
            b"foo"
        );
    }

    #[test]
    fn test_zip_slip_writes_nothing() {
        let bytes = raw_zip(&[("good/A.ttl", b"a"), ("../../evil.ttl", b"x")]);
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out");

        let result = PackageArchiver::new().unpack(&bytes, &dest);
        assert!(matches!(result, Err(Error::SecurityViolation(_))));
        assert!(!dest.join("good").exists());
        assert!(!dir.path().join("evil.ttl").exists());
    }

    #[test]
    fn test_bad_name_writes_nothing() {
        let bytes = raw_zip(&[("good/A.ttl", b"a"), ("bad name.ttl", b"x")]);
        let dir = TempDir::new().unwrap();

        let result = PackageArchiver::new().unpack(&bytes, dir.path());
        assert!(matches!(result, Err(Error::FileNameError(_))));
        assert!(!dir.path().join("good").exists());
    }

    #[test]
    fn test_housekeeping_skipped() {
        let bytes = raw_zip(&[
            ("org.acme/1.0.0/A.ttl", b"a"),
            ("__MACOSX/org.acme/1.0.0/._A.ttl", b"junk"),
            ("org.acme/.DS_Store", b"junk"),
        ]);
        let dir = TempDir::new().unwrap();
        let files = PackageArchiver::new().unpack(&bytes, dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("org.acme/1.0.0/A.ttl")]);
    }

    #[test]
    fn test_limits() {
        let bytes = raw_zip(&[("a.ttl", b"a"), ("b.ttl", b"bbbb")]);
        let dir = TempDir::new().unwrap();

        let few = PackageArchiver::new().with_limits(ArchiveLimits::default().with_max_entries(1));
        assert!(matches!(few.unpack(&bytes, dir.path()), Err(Error::SecurityViolation(_))));

        let small = PackageArchiver::new().with_limits(ArchiveLimits::default().with_max_entry_size(2));
        assert!(matches!(small.unpack(&bytes, dir.path()), Err(Error::SecurityViolation(_))));
        assert!(!dir.path().join("a.ttl").exists());
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let result = PackageArchiver::new().unpack(b"not a zip", dir.path());
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_duplicate_entries_write_nothing() {
        let bytes = raw_zip(&[("a/Foo.ttl", b"first"), ("a/./Foo.ttl", b"second")]);
        let dir = TempDir::new().unwrap();

        let result = PackageArchiver::new().unpack(&bytes, dir.path());
        assert!(matches!(result, Err(Error::FileNameError(_))));
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn test_pack_snapshot_keeps_unusual_names() {
        let mut entries = BTreeMap::new();
        entries.insert("org.acme/1.0.0/Größe.ttl".to_string(), b"g".to_vec());
        assert!(matches!(
            PackageArchiver::new().pack(&entries),
            Err(Error::FileNameError(_))
        ));

        let bytes = PackageArchiver::new().pack_snapshot(&entries).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            archive.file_names().collect::<Vec<_>>(),
            vec!["org.acme/1.0.0/Größe.ttl"]
        );

        let mut escaping = BTreeMap::new();
        escaping.insert("../x.ttl".to_string(), Vec::new());
        assert!(matches!(
            PackageArchiver::new().pack_snapshot(&escaping),
            Err(Error::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_pack_rejects_bad_names() {
        let mut entries = BTreeMap::new();
        entries.insert("../x.ttl".to_string(), Vec::new());
        assert!(matches!(
            PackageArchiver::new().pack(&entries),
            Err(Error::SecurityViolation(_))
        ));
    }
}
