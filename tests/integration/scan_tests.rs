use hashmatch::duplicates::{DigestFinder, FinderConfig};
use hashmatch::scanner::{DigestAlgorithm, Hasher};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

#[test]
fn test_scan_empty_input() {
    let finder = DigestFinder::with_defaults();
    let result = finder.find(Vec::new()).unwrap();

    assert!(result.entries.is_empty());
    assert!(result.matches.is_empty());
    assert!(result.unmatched.is_empty());
    assert_eq!(result.files_processed, 0);
    assert!(!result.interrupted);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    let paths = vec![
        create_test_file(&dir, "a.txt", b"content a"),
        create_test_file(&dir, "b.txt", b"content b"),
        create_test_file(&dir, "c.txt", b"content c"),
    ];

    let result = DigestFinder::with_defaults().find(paths.clone()).unwrap();

    assert!(result.matches.is_empty());
    assert_eq!(result.unmatched.len(), 3);
    let unmatched: Vec<_> = result.unmatched.iter().map(|e| e.path.clone()).collect();
    assert_eq!(unmatched, paths);
}

#[test]
fn test_scan_groups_identical_content() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a.txt", b"duplicate");
    let b = create_test_file(&dir, "b.txt", b"unique");
    let c = create_test_file(&dir, "c.txt", b"duplicate");

    let config = FinderConfig::default()
        .with_workers(2)
        .with_algorithm(DigestAlgorithm::Sha256);
    let result = DigestFinder::new(config)
        .find(vec![a.clone(), b.clone(), c.clone()])
        .unwrap();

    assert_eq!(result.algorithm, "sha256");
    assert_eq!(result.workers, 2);
    assert_eq!(result.matches.len(), 1);

    let group = &result.matches[0];
    assert_eq!(group.count, 2);
    let files: Vec<_> = group.files().map(|e| e.path.clone()).collect();
    assert_eq!(files, vec![a, c]);
    assert_eq!(
        group.digest,
        Hasher::new(DigestAlgorithm::Sha256).hash_bytes(b"duplicate")
    );

    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].path, b);
    assert_eq!(result.duplicate_files(), 1);
    assert_eq!(result.reclaimable_space(), 9);
}

#[test]
fn test_scan_preserves_caller_order_with_many_workers() {
    let dir = tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..40)
        .map(|i| create_test_file(&dir, &format!("f{i:02}.bin"), &vec![i as u8; 1000 + i]))
        .collect();

    let result = DigestFinder::new(FinderConfig::default().with_workers(8))
        .find(paths.clone())
        .unwrap();

    let order: Vec<_> = result.entries.iter().map(|e| e.path.clone()).collect();
    assert_eq!(order, paths);
    assert_eq!(result.files_processed, 40);
}

#[test]
fn test_scan_group_order_is_first_seen() {
    let dir = tempdir().unwrap();
    let x1 = create_test_file(&dir, "x1", b"xxxx");
    let y1 = create_test_file(&dir, "y1", b"yyyy");
    let x2 = create_test_file(&dir, "x2", b"xxxx");
    let y2 = create_test_file(&dir, "y2", b"yyyy");

    let result = DigestFinder::new(FinderConfig::default().with_workers(4))
        .find(vec![y1.clone(), x1.clone(), x2.clone(), y2.clone()])
        .unwrap();

    assert_eq!(result.matches.len(), 2);
    let first: Vec<_> = result.matches[0].files().map(|e| e.path.clone()).collect();
    let second: Vec<_> = result.matches[1].files().map(|e| e.path.clone()).collect();
    assert_eq!(first, vec![y1, y2]);
    assert_eq!(second, vec![x1, x2]);
}

#[test]
fn test_scan_empty_files_match() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"");
    let b = create_test_file(&dir, "b", b"");

    let result = DigestFinder::with_defaults().find(vec![a, b]).unwrap();

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.bytes_processed, 0);
    assert_eq!(result.reclaimable_space(), 0);
}

#[test]
fn test_scan_large_file_spans_buffers() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let a = create_test_file(&dir, "a.bin", &content);
    let b = create_test_file(&dir, "b.bin", &content);

    let config = FinderConfig::default().with_buffer_size(4096);
    let result = DigestFinder::new(config).find(vec![a, b]).unwrap();

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].digest, blake3::hash(&content).to_hex().to_string());
    assert_eq!(result.bytes_processed, 600_000);
}

#[test]
fn test_scan_same_path_twice() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"same");

    let result = DigestFinder::with_defaults()
        .find(vec![a.clone(), a.clone()])
        .unwrap();

    assert_eq!(result.files_processed, 2);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].count, 2);
}

#[test]
fn test_scan_algorithms_differ() {
    let dir = tempdir().unwrap();
    let a = create_test_file(&dir, "a", b"abc");

    for algorithm in DigestAlgorithm::ALL {
        let result = DigestFinder::new(FinderConfig::default().with_algorithm(algorithm))
            .find(vec![a.clone()])
            .unwrap();
        assert_eq!(result.entries[0].digest.len(), algorithm.hex_len());
        assert_eq!(result.entries[0].algorithm, algorithm.as_str());
    }
}
