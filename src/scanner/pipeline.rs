//! Bounded-concurrency batch digesting.
//!
//! # Overview
//!
//! [`DigestPipeline`] digests a list of paths on a dedicated rayon pool of
//! exactly `workers` threads, so no more than `workers` files are read at
//! once. Finished entries are handed back through a bounded channel as an
//! [`EntryStream`], in completion order. [`restore_order`] puts them back in
//! the caller's order.
//!
//! Every dispatched path produces exactly one [`Entry`]; a failure is captured
//! in that entry and never stops sibling work. When the shutdown flag is set,
//! workers stop picking up new paths. Paths that were never started produce
//! no entry at all.
//!
//! # Example
//!
//! ```no_run
//! use hashmatch::scanner::{restore_order, DigestAlgorithm, DigestPipeline, Hasher, PipelineConfig};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let paths = vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")];
//! let hasher = Arc::new(Hasher::new(DigestAlgorithm::Sha256));
//! let pipeline = DigestPipeline::new(hasher, PipelineConfig::default().with_workers(2));
//!
//! let mut stream = pipeline.spawn(paths.clone()).unwrap();
//! let entries: Vec<_> = stream.by_ref().collect();
//! stream.finish().unwrap();
//!
//! let ordered = restore_order(entries, &paths);
//! assert_eq!(ordered.len(), 2);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use rayon::prelude::*;

use super::workers::{available_parallelism, decide_worker_count};
use super::{Entry, Hasher};
use crate::progress::ProgressCallback;

/// Phase name reported to progress callbacks.
pub const HASHING_PHASE: &str = "hashing";

/// Configuration for the digesting pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum number of files digested concurrently.
    pub workers: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("workers", &self.workers)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: decide_worker_count(0, available_parallelism()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl PipelineConfig {
    /// Set the worker count (minimum 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that prevent the pipeline from running at all.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The dispatch thread could not be started.
    #[error("Failed to start dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A worker panicked; some paths may be missing from the output.
    #[error("A digesting worker panicked")]
    WorkerPanicked,
}

/// Digests batches of files on a bounded worker pool.
pub struct DigestPipeline {
    hasher: Arc<Hasher>,
    config: PipelineConfig,
}

impl DigestPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(hasher: Arc<Hasher>, config: PipelineConfig) -> Self {
        Self { hasher, config }
    }

    /// Number of workers this pipeline runs with.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.config.workers.max(1)
    }

    /// Start digesting `paths` in the background.
    ///
    /// Entries arrive on the returned stream in completion order. The
    /// stream ends once every dispatched path has produced its entry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the worker pool or dispatch thread
    /// cannot be created. Per-file failures are reported in the entries.
    pub fn spawn(&self, paths: Vec<PathBuf>) -> Result<EntryStream, PipelineError> {
        let workers = self.workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hashmatch-worker-{}", i))
            .build()?;

        let (tx, rx) = mpsc::sync_channel::<Entry>(workers);
        let interrupted = Arc::new(AtomicBool::new(false));
        let total = paths.len();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(HASHING_PHASE, total);
        }

        log::info!(
            "Digesting {} files with {} workers ({})",
            total,
            workers,
            self.hasher.algorithm_name()
        );

        let hasher = Arc::clone(&self.hasher);
        let config = self.config.clone();
        let stop = Arc::clone(&interrupted);

        let handle = std::thread::Builder::new()
            .name("hashmatch-dispatch".to_string())
            .spawn(move || {
                let started = AtomicUsize::new(0);
                let abandoned = AtomicBool::new(false);

                pool.install(|| {
                    paths.into_par_iter().for_each_with(tx, |tx, path| {
                        if abandoned.load(Ordering::SeqCst) {
                            return;
                        }
                        if config.is_shutdown_requested() {
                            if !stop.swap(true, Ordering::SeqCst) {
                                log::debug!("Shutdown requested, not dispatching remaining files");
                            }
                            return;
                        }

                        let current = started.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(ref callback) = config.progress_callback {
                            callback.on_progress(current, path.to_string_lossy().as_ref());
                        }

                        let entry = digest_path(&hasher, path);

                        if let Some(ref callback) = config.progress_callback {
                            callback.on_item_completed(entry.size);
                        }

                        if tx.send(entry).is_err() {
                            // Receiver dropped: nobody wants the rest.
                            abandoned.store(true, Ordering::SeqCst);
                        }
                    });
                });

                if let Some(ref callback) = config.progress_callback {
                    callback.on_phase_end(HASHING_PHASE);
                }

                log::debug!(
                    "Dispatch finished: {} of {} files started",
                    started.load(Ordering::SeqCst),
                    total
                );
            })
            .map_err(PipelineError::Spawn)?;

        Ok(EntryStream {
            rx: Some(rx),
            handle: Some(handle),
            interrupted,
            total,
        })
    }

    /// Digest `paths` and return the entries in the caller's order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the pipeline could not run or a worker
    /// panicked.
    pub fn run(&self, paths: Vec<PathBuf>) -> Result<Vec<Entry>, PipelineError> {
        let order = paths.clone();
        let mut stream = self.spawn(paths)?;
        let entries: Vec<Entry> = stream.by_ref().collect();
        stream.finish()?;
        Ok(restore_order(entries, &order))
    }
}

/// Digest a single path into an entry.
fn digest_path(hasher: &Hasher, path: PathBuf) -> Entry {
    let algorithm = hasher.algorithm_name();
    match hasher.hash_file(&path) {
        Ok(result) => {
            log::trace!("{}  {}", result.digest, path.display());
            Entry::success(path, result.digest, result.size, algorithm)
        }
        Err(e) => {
            log::warn!("Failed to hash {}: {}", path.display(), e);
            Entry::failure(path, e, algorithm)
        }
    }
}

/// Unordered stream of finished entries from a running pipeline.
///
/// Finite and not restartable. Iterate it (usually with `by_ref()`), then
/// call [`EntryStream::finish`] to join the dispatcher. Dropping the stream
/// early stops dispatch of unstarted paths and joins the dispatcher too.
pub struct EntryStream {
    rx: Option<Receiver<Entry>>,
    handle: Option<JoinHandle<()>>,
    interrupted: Arc<AtomicBool>,
    total: usize,
}

impl EntryStream {
    /// Number of paths submitted to the pipeline.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether cancellation stopped dispatch before every path was started.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Wait for the dispatcher to exit.
    ///
    /// Any entries not yet received are discarded. Returns whether the run
    /// was interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WorkerPanicked`] if a worker panicked.
    pub fn finish(mut self) -> Result<bool, PipelineError> {
        // Drain until every sender is gone so blocked workers can exit.
        if let Some(rx) = self.rx.take() {
            for _ in rx.iter() {}
        }
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| PipelineError::WorkerPanicked)?;
        }
        Ok(self.was_interrupted())
    }
}

impl Iterator for EntryStream {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for EntryStream {
    fn drop(&mut self) {
        // Closing the receiver fails pending sends, so workers skip the rest.
        self.rx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("A digesting worker panicked after the stream was dropped");
            }
        }
    }
}

/// Sort entries back into the order their paths appear in `paths`.
///
/// The sort is stable; entries whose path is not in `paths` go last. When a
/// path appears more than once, its first position is used.
#[must_use]
pub fn restore_order(mut entries: Vec<Entry>, paths: &[PathBuf]) -> Vec<Entry> {
    let mut index: HashMap<&Path, usize> = HashMap::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        index.entry(path.as_path()).or_insert(i);
    }

    entries.sort_by_key(|entry| {
        index
            .get(entry.path.as_path())
            .copied()
            .unwrap_or(usize::MAX)
    });
    entries
}
