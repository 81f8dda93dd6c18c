//! Property-based tests for identities, groupings and packages.
//!
//! Uses proptest to verify invariants across random inputs:
//! - URN display/parse roundtrips
//! - Version bumps reset minor and patch
//! - Groupings do not depend on input order
//! - Packed archives unpack to the same files

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use aspect_workspace::io::PackageArchiver;
use aspect_workspace::models::{ModelFile, ModelUrn, ModelVersion, NamespaceGrouping};
use aspect_workspace::services::PathResolver;
use proptest::prelude::*;
use tempfile::TempDir;

fn namespace() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_-]{0,8}", 1..4).prop_map(|parts| parts.join("."))
}

fn version() -> impl Strategy<Value = ModelVersion> {
    (0u64..100, 0u64..100, 0u64..100).prop_map(|(a, b, c)| ModelVersion::new(a, b, c))
}

fn element() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,16}"
}

fn urn() -> impl Strategy<Value = ModelUrn> {
    (namespace(), version(), element())
        .prop_map(|(ns, v, el)| ModelUrn::new(ns, v, el).unwrap())
}

proptest! {
    /// Property: a URN survives display then parse unchanged.
    #[test]
    fn prop_urn_display_parse_roundtrip(urn in urn()) {
        let text = urn.to_string();
        prop_assert!(text.starts_with("urn:samm:"));
        prop_assert_eq!(ModelUrn::parse(&text).unwrap(), urn);
    }

    /// Property: legacy URNs parse to the same identity.
    #[test]
    fn prop_legacy_prefix_same_identity(urn in urn()) {
        let legacy = urn.to_string().replacen("urn:samm:", "urn:bamm:", 1);
        prop_assert_eq!(ModelUrn::parse(&legacy).unwrap(), urn);
    }

    /// Property: the next major version is greater and resets minor/patch.
    #[test]
    fn prop_next_major(v in version()) {
        let next = v.next_major();
        prop_assert!(next > v);
        prop_assert_eq!(next, ModelVersion::new(v.major + 1, 0, 0));
    }

    /// Property: resolved paths always stay under the workspace root.
    #[test]
    fn prop_resolved_paths_under_root(urn in urn()) {
        let resolver = PathResolver::new("/workspace");
        let path = resolver.for_urn(&urn).unwrap();
        prop_assert!(path.starts_with("/workspace"));
        let identity = resolver.identity_from_path(&path).unwrap();
        prop_assert_eq!(identity.0, urn.namespace());
        prop_assert_eq!(identity.1, urn.version());
    }

    /// Property: groupings built from the same files in any order are equal.
    #[test]
    fn prop_grouping_order_independent(
        urns in prop::collection::btree_set(urn(), 1..20),
        seed in any::<u64>(),
    ) {
        let files: Vec<ModelFile> = urns
            .iter()
            .map(|u| ModelFile::new(format!("{}.ttl", u.element().unwrap())).with_urn(u.clone()))
            .collect();

        let mut shuffled = files.clone();
        let len = shuffled.len();
        for i in 0..len {
            let j = usize::try_from(seed.wrapping_mul(i as u64 + 7) % len as u64).unwrap();
            shuffled.swap(i, j);
        }
        shuffled.reverse();

        let forward = NamespaceGrouping::from_files(files);
        let backward = NamespaceGrouping::from_files(shuffled);
        prop_assert_eq!(&forward, &backward);

        let namespaces: Vec<&str> = forward.namespaces().collect();
        let mut sorted = namespaces.clone();
        sorted.sort_unstable();
        prop_assert_eq!(namespaces, sorted);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: unpacking a packed archive reproduces every entry.
    #[test]
    fn prop_archive_roundtrip(
        entries in prop::collection::btree_map(
            "m[a-z]{0,7}(/m[a-z0-9]{0,7}){0,2}\\.ttl",
            prop::collection::vec(any::<u8>(), 0..512),
            1..12,
        )
    ) {
        let archiver = PackageArchiver::new();
        let bytes = archiver.pack(&entries).unwrap();
        let dir = TempDir::new().unwrap();
        let written = archiver.unpack(&bytes, dir.path()).unwrap();

        prop_assert_eq!(written.len(), entries.len());
        for (name, content) in &entries {
            let on_disk = std::fs::read(dir.path().join(name)).unwrap();
            prop_assert_eq!(&on_disk, content);
        }
    }
}
