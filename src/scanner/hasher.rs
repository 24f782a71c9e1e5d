//! Streaming file hasher over pluggable digest algorithms.
//!
//! # Overview
//! [`Digester`] is the seam between the pipeline and the hash functions.
//! [`DigestAlgorithm`] implements it for the built-in algorithms (BLAKE3,
//! SHA-256, SHA-512); [`Hasher`] streams file contents through any digester
//! using a fixed-size read buffer, so memory use does not grow with file size.

use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::HashError;

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Incremental digest state for one file.
pub trait DigestState: Send {
    /// Feed the next chunk of content.
    fn update(&mut self, data: &[u8]);

    /// Consume the state and return the lowercase hex digest.
    fn finalize_hex(self: Box<Self>) -> String;
}

/// A digest algorithm the pipeline can use.
pub trait Digester: Send + Sync {
    /// Identifier recorded on every entry (e.g. "sha256").
    fn name(&self) -> &str;

    /// Start a fresh digest.
    fn begin(&self) -> Box<dyn DigestState>;
}

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// BLAKE3 (256-bit)
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// All supported algorithms.
    pub const ALL: [DigestAlgorithm; 3] = [Self::Blake3, Self::Sha256, Self::Sha512];

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex digest this algorithm produces.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Blake3 | Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving a digest algorithm.
///
/// This is the only error that aborts a whole batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// The selector does not name a supported algorithm.
    #[error("Unsupported digest algorithm: {0:?} (expected one of blake3, sha256, sha512)")]
    Unsupported(String),
}

impl FromStr for DigestAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blake3" | "b3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(AlgorithmError::Unsupported(s.to_string())),
        }
    }
}

struct Blake3State(blake3::Hasher);

impl DigestState for Blake3State {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

struct Sha2State<D>(D);

impl<D> DigestState for Sha2State<D>
where
    D: sha2::Digest + Send,
    sha2::digest::Output<D>: fmt::LowerHex,
{
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:x}", self.0.finalize())
    }
}

impl Digester for DigestAlgorithm {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn begin(&self) -> Box<dyn DigestState> {
        match self {
            Self::Blake3 => Box::new(Blake3State(blake3::Hasher::new())),
            Self::Sha256 => Box::new(Sha2State(sha2::Sha256::new())),
            Self::Sha512 => Box::new(Sha2State(sha2::Sha512::new())),
        }
    }
}

/// Digest and byte count of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex digest
    pub digest: String,
    /// Number of bytes read
    pub size: u64,
}

/// Streaming file hasher.
///
/// # Example
///
/// ```no_run
/// use hashmatch::scanner::{DigestAlgorithm, Hasher};
/// use std::path::Path;
///
/// let hasher = Hasher::new(DigestAlgorithm::Sha256);
/// let result = hasher.hash_file(Path::new("some_file.txt")).unwrap();
/// println!("{} ({} bytes)", result.digest, result.size);
/// ```
#[derive(Clone)]
pub struct Hasher {
    digester: Arc<dyn Digester>,
    buffer_size: usize,
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("digester", &self.digester.name())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

impl Hasher {
    /// Create a hasher for one of the built-in algorithms.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self::with_digester(Arc::new(algorithm))
    }

    /// Create a hasher around any digest implementation.
    #[must_use]
    pub fn with_digester(digester: Arc<dyn Digester>) -> Self {
        Self {
            digester,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the read buffer size in bytes (minimum 1).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Name of the underlying algorithm.
    #[must_use]
    pub fn algorithm_name(&self) -> &str {
        self.digester.name()
    }

    /// Read buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Digest an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let mut state = self.digester.begin();
        state.update(data);
        state.finalize_hex()
    }

    /// Digest the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the path is missing, unreadable, not a
    /// regular file, or a read fails part way. No digest is returned for a
    /// partially read file.
    pub fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        // Opening a FIFO blocks until a writer shows up, so check first.
        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(HashError::NotAFile(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;

        // The path may have been swapped between the check and the open.
        let metadata = file.metadata().map_err(|e| HashError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(HashError::NotAFile(path.to_path_buf()));
        }

        let mut state = self.digester.begin();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut size: u64 = 0;

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    state.update(&buffer[..n]);
                    size += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(FileDigest {
            digest: state.finalize_hex(),
            size,
        })
    }
}
