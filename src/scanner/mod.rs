//! Scanner module for worker sizing and file digesting.
//!
//! This module provides functionality for:
//! - Choosing a worker count from host capacity
//! - Streaming file contents through a pluggable digest
//! - Digesting a batch of paths on a bounded worker pool
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`workers`]: Worker sizing policy
//! - [`hasher`]: Digest algorithms and the streaming file hasher
//! - [`pipeline`]: Bounded-concurrency batch digesting
//!
//! # Example
//!
//! ```no_run
//! use hashmatch::scanner::{
//!     available_parallelism, decide_worker_count, DigestAlgorithm, DigestPipeline, Hasher,
//!     PipelineConfig,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let workers = decide_worker_count(0, available_parallelism());
//! let hasher = Arc::new(Hasher::new(DigestAlgorithm::Blake3));
//! let pipeline = DigestPipeline::new(hasher, PipelineConfig::default().with_workers(workers));
//!
//! let paths = vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")];
//! for entry in pipeline.run(paths).unwrap() {
//!     println!("{} {}", entry.digest, entry.path.display());
//! }
//! ```

pub mod hasher;
pub mod pipeline;
pub mod workers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

// Re-export main types
pub use hasher::{
    AlgorithmError, DigestAlgorithm, DigestState, Digester, FileDigest, Hasher,
    DEFAULT_BUFFER_SIZE,
};
pub use pipeline::{restore_order, DigestPipeline, EntryStream, PipelineConfig, PipelineError};
pub use workers::{available_parallelism, decide_worker_count, MAX_AUTO_WORKERS};

/// The outcome of digesting one file, or a reference digest injected by the
/// pool matcher.
///
/// Exactly one of `digest` (non-empty) and `error` is set. Use the
/// constructors; they are the only place that invariant is established.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Caller supplied path. For reference entries this is the digest itself.
    pub path: PathBuf,
    /// Lowercase hex digest, empty when hashing failed
    pub digest: String,
    /// Bytes read, 0 on failure and for references
    pub size: u64,
    /// Name of the digest algorithm
    pub algorithm: String,
    /// Why this file could not be digested
    pub error: Option<HashError>,
    /// Whether this entry stands for a caller supplied reference digest
    pub is_reference: bool,
}

impl Entry {
    /// Create an entry for a successfully digested file.
    ///
    /// The digest is stored lowercased whatever case the digester produced.
    #[must_use]
    pub fn success(path: PathBuf, mut digest: String, size: u64, algorithm: &str) -> Self {
        digest.make_ascii_lowercase();
        Self {
            path,
            digest,
            size,
            algorithm: algorithm.to_string(),
            error: None,
            is_reference: false,
        }
    }

    /// Create an entry for a file that could not be digested.
    #[must_use]
    pub fn failure(path: PathBuf, error: HashError, algorithm: &str) -> Self {
        Self {
            path,
            digest: String::new(),
            size: 0,
            algorithm: algorithm.to_string(),
            error: Some(error),
            is_reference: false,
        }
    }

    /// Create an entry standing for a reference digest.
    ///
    /// The digest is expected to be normalized already.
    #[must_use]
    pub fn reference(digest: &str, algorithm: &str) -> Self {
        Self {
            path: PathBuf::from(digest),
            digest: digest.to_string(),
            size: 0,
            algorithm: algorithm.to_string(),
            error: None,
            is_reference: true,
        }
    }

    /// Whether a digest was produced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Errors that can occur while digesting a single file.
///
/// These never abort a batch; they are captured into the file's [`Entry`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a regular file (e.g. a directory).
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HashError {
    /// Classify an I/O error raised while opening or reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::IsADirectory => Self::NotAFile(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(err),
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::NotAFile(p) => p,
            Self::Io { path, .. } => path,
        }
    }

    /// Short machine-readable kind, used by output formatters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotAFile(_) => "not_a_file",
            Self::Io { .. } => "io",
        }
    }
}
