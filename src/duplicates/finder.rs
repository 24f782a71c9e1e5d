//! Digest finder: runs the pipeline and classifies the results.
//!
//! # Overview
//!
//! [`DigestFinder::find`] ties the pieces together:
//! 1. **Sizing** - pick the worker count ([`crate::scanner::decide_worker_count`])
//! 2. **Digesting** - stream entries from the [`DigestPipeline`] into a [`ScanResult`]
//! 3. **Ordering** - put entries back in the caller's path order
//! 4. **Classification** - plain grouping, or pool matching when reference
//!    digests were configured (see [`crate::duplicates::groups`])
//!
//! # Example
//!
//! ```no_run
//! use hashmatch::duplicates::{DigestFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let config = FinderConfig::default()
//!     .with_algorithm_name("sha256")
//!     .unwrap()
//!     .with_references(vec!["e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into()]);
//!
//! let finder = DigestFinder::new(config);
//! let result = finder.find(vec![PathBuf::from("empty.txt")]).unwrap();
//!
//! println!("{} groups, {} reference orphans", result.matches.len(), result.ref_orphans.len());
//! ```

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::groups::{group_pool_results, group_results, legacy_pool_matches, MatchGroup, PoolMatch};
use crate::progress::ProgressCallback;
use crate::scanner::{
    available_parallelism, decide_worker_count, restore_order, AlgorithmError, DigestAlgorithm,
    DigestPipeline, Digester, Entry, HashError, Hasher, PipelineConfig, PipelineError,
    DEFAULT_BUFFER_SIZE,
};

/// Configuration for the digest finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Requested worker count, 0 for automatic sizing.
    pub workers: usize,
    /// Digest implementation.
    pub digester: Arc<dyn Digester>,
    /// Reference digests. `Some` selects pool matching.
    pub references: Option<Vec<String>>,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("digester", &self.digester.name())
            .field("references", &self.references)
            .field("buffer_size", &self.buffer_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            digester: Arc::new(DigestAlgorithm::default()),
            references: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the requested worker count (0 = auto).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Use one of the built-in algorithms.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digester = Arc::new(algorithm);
        self
    }

    /// Resolve an algorithm selector such as `"sha256"`.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError`] if the selector is not supported.
    pub fn with_algorithm_name(self, name: &str) -> Result<Self, AlgorithmError> {
        Ok(self.with_algorithm(name.parse()?))
    }

    /// Use a custom digest implementation.
    #[must_use]
    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    /// Match files against these reference digests.
    #[must_use]
    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = Some(references);
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
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
}

/// Everything one invocation produced.
///
/// Built empty, filled through [`ScanResult::record`] while the pipeline
/// drains, then finalized once. Read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Algorithm used
    pub algorithm: String,
    /// Worker count used
    pub workers: usize,
    /// Every entry, in caller order once finalized
    pub entries: Vec<Entry>,
    /// Match groups in first-seen digest order
    pub matches: Vec<MatchGroup>,
    /// Files that matched nothing
    pub unmatched: Vec<Entry>,
    /// Legacy pool verification matches
    pub pool_matches: Vec<PoolMatch>,
    /// Reference digests that matched no file
    pub ref_orphans: Vec<Entry>,
    /// Per-file failures, in caller order once finalized
    pub errors: Vec<HashError>,
    /// Number of entries recorded (successes and failures)
    pub files_processed: usize,
    /// Bytes digested successfully
    pub bytes_processed: u64,
    /// Wall-clock time of the run
    pub duration: Duration,
    /// Whether cancellation stopped the run early
    pub interrupted: bool,
    /// Whether pool matching was used
    pub pool_mode: bool,
}

impl ScanResult {
    /// Create an empty result.
    #[must_use]
    pub fn new(algorithm: &str, workers: usize) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            workers,
            ..Default::default()
        }
    }

    /// Add one finished entry.
    pub fn record(&mut self, entry: Entry) {
        self.files_processed += 1;
        match entry.error {
            Some(ref e) => self.errors.push(e.clone()),
            None => self.bytes_processed += entry.size,
        }
        self.entries.push(entry);
    }

    /// Restore caller order and classify the entries.
    ///
    /// `references` selects pool matching when `Some`.
    pub fn finalize(&mut self, paths: &[PathBuf], references: Option<&[String]>) {
        self.entries = restore_order(std::mem::take(&mut self.entries), paths);
        self.errors = self
            .entries
            .iter()
            .filter_map(|e| e.error.clone())
            .collect();

        match references {
            Some(references) => {
                let pool = group_pool_results(&self.entries, references, &self.algorithm);
                self.matches = pool.matches;
                self.unmatched = pool.file_orphans;
                self.ref_orphans = pool.ref_orphans;
                self.pool_mode = true;

                if self.matches.is_empty() && !references.is_empty() {
                    self.pool_matches =
                        legacy_pool_matches(&self.entries, references, &self.algorithm);
                }
            }
            None => {
                let (matches, unmatched) = group_results(&self.entries);
                self.matches = matches;
                self.unmatched = unmatched;
            }
        }
    }

    /// Whether any match was found (groups or legacy pool matches).
    #[must_use]
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty() || !self.pool_matches.is_empty()
    }

    /// Number of files that are redundant copies within groups.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.matches
            .iter()
            .map(|g| g.files().count().saturating_sub(1))
            .sum()
    }

    /// Bytes taken by redundant copies within groups.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.matches
            .iter()
            .map(|g| {
                let files: Vec<&Entry> = g.files().collect();
                let size = files.first().map_or(0, |f| f.size);
                size * files.len().saturating_sub(1) as u64
            })
            .sum()
    }
}

/// Errors that abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The digest algorithm could not be resolved.
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    /// The digesting pipeline could not run.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Digests a list of files and classifies the results.
pub struct DigestFinder {
    config: FinderConfig,
    hasher: Arc<Hasher>,
}

impl DigestFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::with_digester(Arc::clone(&config.digester))
            .with_buffer_size(config.buffer_size);
        Self {
            config,
            hasher: Arc::new(hasher),
        }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Worker count this finder will run with on this host.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        decide_worker_count(self.config.workers, available_parallelism())
    }

    /// Digest `paths` and classify the results.
    ///
    /// Per-file failures are collected in [`ScanResult::errors`]; they never
    /// abort the run. If the shutdown flag is raised, the result holds only
    /// the files that were started and `interrupted` is set.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Pipeline`] if the worker pool cannot be built
    /// or a worker panicked.
    pub fn find(&self, paths: Vec<PathBuf>) -> Result<ScanResult, FinderError> {
        let start_time = Instant::now();
        let workers = self.worker_count();
        let mut result = ScanResult::new(self.hasher.algorithm_name(), workers);

        let mut pipeline_config = PipelineConfig::default().with_workers(workers);
        if let Some(ref flag) = self.config.shutdown_flag {
            pipeline_config = pipeline_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            pipeline_config = pipeline_config.with_progress_callback(Arc::clone(callback));
        }

        let pipeline = DigestPipeline::new(Arc::clone(&self.hasher), pipeline_config);
        let mut stream = pipeline.spawn(paths.clone())?;
        for entry in stream.by_ref() {
            result.record(entry);
        }
        result.interrupted = stream.finish()?;

        if result.interrupted {
            log::info!(
                "Interrupted by shutdown signal after {} of {} files",
                result.files_processed,
                paths.len()
            );
        }

        result.finalize(&paths, self.config.references.as_deref());
        result.duration = start_time.elapsed();

        log::info!(
            "Processed {} files ({} bytes) in {:.2?}: {} groups, {} unmatched, {} errors",
            result.files_processed,
            result.bytes_processed,
            result.duration,
            result.matches.len(),
            result.unmatched.len(),
            result.errors.len()
        );

        Ok(result)
    }
}
