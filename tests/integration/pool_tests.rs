use hashmatch::duplicates::{DigestFinder, FinderConfig};
use hashmatch::scanner::{DigestAlgorithm, DigestState, Digester, Hasher};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn sha256(content: &[u8]) -> String {
    Hasher::new(DigestAlgorithm::Sha256).hash_bytes(content)
}

fn pool_finder(references: Vec<String>) -> DigestFinder {
    DigestFinder::new(
        FinderConfig::default()
            .with_algorithm(DigestAlgorithm::Sha256)
            .with_workers(3)
            .with_references(references),
    )
}

#[test]
fn test_pool_matches_known_digest() {
    let dir = tempdir().unwrap();
    let known = create_test_file(&dir, "known.iso", b"release image");
    let other = create_test_file(&dir, "other.iso", b"something else");

    let reference = sha256(b"release image").to_uppercase();
    let orphan = "00".repeat(32);
    let result = pool_finder(vec![reference, orphan.clone()])
        .find(vec![known.clone(), other.clone()])
        .unwrap();

    assert!(result.pool_mode);
    assert_eq!(result.matches.len(), 1);

    let group = &result.matches[0];
    let files: Vec<_> = group.files().map(|e| e.path.clone()).collect();
    assert_eq!(files, vec![known]);
    let refs: Vec<_> = group.references().map(|e| e.digest.clone()).collect();
    assert_eq!(refs, vec![sha256(b"release image")]);

    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].path, other);

    assert_eq!(result.ref_orphans.len(), 1);
    assert_eq!(result.ref_orphans[0].digest, orphan);
    assert!(result.ref_orphans[0].is_reference);
    assert!(result.pool_matches.is_empty());
}

#[test]
fn test_pool_references_placed_exactly_once() {
    let dir = tempdir().unwrap();
    let paths = vec![
        create_test_file(&dir, "a", b"one"),
        create_test_file(&dir, "b", b"two"),
        create_test_file(&dir, "c", b"one"),
    ];
    let references = vec![
        format!("  {}  ", sha256(b"one")),
        sha256(b"three"),
        sha256(b"two"),
        sha256(b"two"),
    ];

    let result = pool_finder(references.clone()).find(paths).unwrap();

    let in_groups: usize = result.matches.iter().map(|g| g.references().count()).sum();
    assert_eq!(in_groups + result.ref_orphans.len(), references.len());
    assert_eq!(result.ref_orphans.len(), 1);

    // "two" has one file plus two references
    let two = result
        .matches
        .iter()
        .find(|g| g.digest == sha256(b"two"))
        .unwrap();
    assert_eq!(two.count, 3);
}

#[test]
fn test_pool_files_still_group_with_each_other() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"same");
    let b = create_test_file(&dir, "b", b"same");

    let result = pool_finder(vec!["ff".repeat(32)]).find(vec![a, b]).unwrap();

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].references().count(), 0);
    assert_eq!(result.ref_orphans.len(), 1);
    assert!(result.pool_matches.is_empty());
}

#[test]
fn test_pool_with_no_references() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"x");

    let result = pool_finder(Vec::new()).find(vec![a]).unwrap();

    assert!(result.pool_mode);
    assert!(result.matches.is_empty());
    assert_eq!(result.unmatched.len(), 1);
    assert!(result.ref_orphans.is_empty());
    assert!(!result.has_matches());
}

/// Uppercases the SHA-256 hex of whatever it reads.
struct ShoutingDigester;

struct ShoutingState(Box<dyn DigestState>);

impl DigestState for ShoutingState {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        self.0.finalize_hex().to_uppercase()
    }
}

impl Digester for ShoutingDigester {
    fn name(&self) -> &str {
        "shouting"
    }

    fn begin(&self) -> Box<dyn DigestState> {
        Box::new(ShoutingState(DigestAlgorithm::Sha256.begin()))
    }
}

#[test]
fn test_pool_uppercase_digester_still_groups_with_reference() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"x");

    let config = FinderConfig::default()
        .with_digester(Arc::new(ShoutingDigester))
        .with_references(vec![sha256(b"x")]);
    let result = DigestFinder::new(config).find(vec![a.clone()]).unwrap();

    assert_eq!(result.entries[0].digest, sha256(b"x"));
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].count, 2);
    assert!(result.unmatched.is_empty());
    assert!(result.ref_orphans.is_empty());
    assert!(result.pool_matches.is_empty());
}

#[test]
fn test_pool_legacy_matches_empty_without_file_match() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"anything");

    let result = pool_finder(vec![sha256(b"missing").to_uppercase()])
        .find(vec![a])
        .unwrap();

    assert!(result.matches.is_empty());
    assert_eq!(result.ref_orphans.len(), 1);
    assert!(result.pool_matches.is_empty());
    assert!(!result.has_matches());
}
