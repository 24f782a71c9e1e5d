use hashmatch::duplicates::{DigestFinder, FinderConfig};
use hashmatch::error::ExitCode;
use hashmatch::progress::ProgressCallback;
use hashmatch::scanner::{DigestPipeline, Hasher, PipelineConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn create_files(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("file_{i}"));
            fs::write(&path, format!("content {i}")).unwrap();
            path
        })
        .collect()
}

/// Raises the shutdown flag once `after` files have been started.
struct StopAfter {
    flag: Arc<AtomicBool>,
    after: usize,
    started: AtomicUsize,
}

impl ProgressCallback for StopAfter {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        if self.started.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.flag.store(true, Ordering::SeqCst);
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_shutdown_before_start() {
    let dir = tempdir().unwrap();
    let paths = create_files(&dir, 10);
    let flag = Arc::new(AtomicBool::new(true));

    let result = DigestFinder::new(FinderConfig::default().with_shutdown_flag(flag))
        .find(paths)
        .unwrap();

    assert!(result.interrupted);
    assert_eq!(result.files_processed, 0);
    assert_eq!(ExitCode::from_result(&result), ExitCode::Interrupted);
}

#[test]
fn test_shutdown_mid_run_keeps_started_files() {
    let dir = tempdir().unwrap();
    let paths = create_files(&dir, 200);
    let flag = Arc::new(AtomicBool::new(false));
    let stopper = Arc::new(StopAfter {
        flag: Arc::clone(&flag),
        after: 5,
        started: AtomicUsize::new(0),
    });

    let config = FinderConfig::default()
        .with_workers(2)
        .with_shutdown_flag(flag)
        .with_progress_callback(stopper.clone());
    let result = DigestFinder::new(config).find(paths.clone()).unwrap();

    assert!(result.interrupted);
    assert!(result.files_processed >= 5);
    assert!(result.files_processed < paths.len());
    assert_eq!(result.files_processed, stopper.started.load(Ordering::SeqCst));

    // Everything that was started completed successfully
    assert!(result.entries.iter().all(|e| e.is_ok()));
}

/// Records how far dispatch got and whether it has wound down.
#[derive(Default)]
struct PhaseTracker {
    started: AtomicUsize,
    ended: AtomicBool,
}

impl ProgressCallback for PhaseTracker {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: &str) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_dropped_stream_joins_cleanly() {
    let dir = tempdir().unwrap();
    let paths = create_files(&dir, 200);
    let tracker = Arc::new(PhaseTracker::default());

    let pipeline = DigestPipeline::new(
        Arc::new(Hasher::default()),
        PipelineConfig::default()
            .with_workers(2)
            .with_progress_callback(tracker.clone()),
    );
    let mut stream = pipeline.spawn(paths.clone()).unwrap();
    assert!(stream.next().is_some());
    drop(stream);

    // The dispatcher has already exited by the time drop returns
    assert!(tracker.ended.load(Ordering::SeqCst));
    assert!(tracker.started.load(Ordering::SeqCst) < paths.len());

    // A fresh pipeline still runs after the abandoned one
    let again = DigestPipeline::new(
        Arc::new(Hasher::default()),
        PipelineConfig::default().with_workers(2),
    )
    .run(create_files(&dir, 3))
    .unwrap();
    assert_eq!(again.len(), 3);
}
