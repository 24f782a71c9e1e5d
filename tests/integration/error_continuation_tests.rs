use hashmatch::duplicates::{DigestFinder, FinderConfig};
use hashmatch::error::ExitCode;
use hashmatch::scanner::HashError;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_missing_file_does_not_abort_run() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();
    let missing = dir.path().join("missing");

    let result = DigestFinder::new(FinderConfig::default().with_workers(2))
        .find(vec![a.clone(), missing.clone(), b.clone()])
        .unwrap();

    assert_eq!(result.files_processed, 3);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(&result.errors[0], HashError::NotFound(p) if *p == missing));

    // Failed entries keep their slot in caller order
    let order: Vec<_> = result.entries.iter().map(|e| e.path.clone()).collect();
    assert_eq!(order, vec![a, missing, b]);
    assert!(!result.entries[1].is_ok());
    assert!(result.entries[1].digest.is_empty());

    assert_eq!(ExitCode::from_result(&result), ExitCode::PartialSuccess);
}

#[test]
fn test_directory_is_reported_not_grouped() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();

    let result = DigestFinder::with_defaults().find(vec![sub.clone()]).unwrap();

    assert!(result.matches.is_empty());
    assert!(result.unmatched.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path(), sub.as_path());
    assert_eq!(result.errors[0].kind(), "not_a_file");
}

#[test]
fn test_errors_follow_caller_order() {
    let paths: Vec<PathBuf> = (0..12)
        .map(|i| PathBuf::from(format!("/nonexistent/hashmatch/{i}")))
        .collect();

    let result = DigestFinder::new(FinderConfig::default().with_workers(4))
        .find(paths.clone())
        .unwrap();

    let error_paths: Vec<_> = result.errors.iter().map(|e| e.path().to_path_buf()).collect();
    assert_eq!(error_paths, paths);
    assert_eq!(result.bytes_processed, 0);
    assert!(!result.has_matches());
}

#[cfg(unix)]
#[test]
fn test_permission_denied_is_isolated() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    let open = dir.path().join("open");
    fs::write(&locked, b"secret").unwrap();
    fs::write(&open, b"public").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to check in that case
    if fs::read(&locked).is_ok() {
        return;
    }

    let result = DigestFinder::with_defaults()
        .find(vec![locked.clone(), open])
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind(), "permission_denied");
    assert_eq!(result.unmatched.len(), 1);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_fifo_does_not_stall_batch() {
    use std::sync::mpsc;
    use std::time::Duration;

    let dir = tempdir().unwrap();
    let ok = dir.path().join("ok");
    fs::write(&ok, b"regular").unwrap();
    let fifo = dir.path().join("pipe");
    let made = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .is_ok_and(|s| s.success());
    if !made {
        return;
    }

    let (tx, rx) = mpsc::channel();
    let paths = vec![ok.clone(), fifo.clone()];
    std::thread::spawn(move || {
        let result = DigestFinder::new(FinderConfig::default().with_workers(2)).find(paths);
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("batch stalled on a FIFO")
        .unwrap();

    assert_eq!(result.files_processed, 2);
    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].path, ok);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind(), "not_a_file");
    assert_eq!(result.errors[0].path(), fifo.as_path());
}

#[cfg(target_os = "linux")]
#[test]
fn test_read_failure_after_open_yields_no_digest() {
    // Opens fine; reading offset 0 of our own address space fails with EIO.
    let mem = PathBuf::from("/proc/self/mem");
    if !mem.exists() {
        return;
    }

    let result = DigestFinder::with_defaults().find(vec![mem.clone()]).unwrap();

    assert_eq!(result.files_processed, 1);
    assert_eq!(result.bytes_processed, 0);
    let entry = &result.entries[0];
    assert!(!entry.is_ok());
    assert!(entry.digest.is_empty());
    assert_eq!(entry.size, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path(), mem.as_path());
    assert_eq!(result.errors[0].kind(), "io");
    assert!(result.unmatched.is_empty());
}
