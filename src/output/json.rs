//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "digest": "ba7816bf...",
//!       "count": 3,
//!       "files": ["/data/a.bin", "/data/b.bin"],
//!       "references": ["ba7816bf..."]
//!     }
//!   ],
//!   "unmatched": [{ "path": "/data/c.bin", "digest": "...", "size": 12 }],
//!   "ref_orphans": ["00ff..."],
//!   "pool_matches": [],
//!   "errors": [{ "path": "/data/gone", "kind": "not_found", "message": "..." }],
//!   "summary": {
//!     "algorithm": "sha256",
//!     "workers": 6,
//!     "mode": "pool",
//!     "files_processed": 4,
//!     "bytes_processed": 36,
//!     "duration_ms": 3,
//!     "interrupted": false,
//!     "exit_code": 3,
//!     "exit_code_name": "HM003"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{MatchGroup, PoolMatch, ScanResult};
use crate::error::ExitCode;
use crate::scanner::{Entry, HashError};

/// A match group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatchGroup {
    /// Shared digest (lowercase hex)
    pub digest: String,
    /// Total members, files plus references
    pub count: usize,
    /// Member file paths in caller order
    pub files: Vec<String>,
    /// Reference digests attached to this group
    pub references: Vec<String>,
}

impl JsonMatchGroup {
    /// Convert a [`MatchGroup`].
    #[must_use]
    pub fn from_match_group(group: &MatchGroup) -> Self {
        Self {
            digest: group.digest.clone(),
            count: group.count,
            files: group.files().map(|e| path_string(e)).collect(),
            references: group.references().map(|e| e.digest.clone()).collect(),
        }
    }
}

/// A file that matched nothing.
#[derive(Debug, Clone, Serialize)]
pub struct JsonUnmatched {
    /// File path
    pub path: String,
    /// Its digest
    pub digest: String,
    /// Size in bytes
    pub size: u64,
}

/// A per-file failure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonError {
    /// Path that failed
    pub path: String,
    /// Short failure category (`not_found`, `permission_denied`, ...)
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&HashError> for JsonError {
    fn from(err: &HashError) -> Self {
        Self {
            path: err.path().to_string_lossy().into_owned(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Digest algorithm used
    pub algorithm: String,
    /// Worker count used
    pub workers: usize,
    /// `"group"` or `"pool"`
    pub mode: String,
    /// Files digested or failed
    pub files_processed: usize,
    /// Bytes digested successfully
    pub bytes_processed: u64,
    /// Number of match groups
    pub match_groups: usize,
    /// Redundant file copies inside groups
    pub duplicate_files: usize,
    /// Bytes taken by redundant copies
    pub reclaimable_space: u64,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "HM000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanResult`] and an exit code.
    #[must_use]
    pub fn from_result(result: &ScanResult, exit_code: ExitCode) -> Self {
        Self {
            algorithm: result.algorithm.clone(),
            workers: result.workers,
            mode: if result.pool_mode { "pool" } else { "group" }.to_string(),
            files_processed: result.files_processed,
            bytes_processed: result.bytes_processed,
            match_groups: result.matches.len(),
            duplicate_files: result.duplicate_files(),
            reclaimable_space: result.reclaimable_space(),
            duration_ms: result.duration.as_millis() as u64,
            interrupted: result.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON document for one run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Match groups
    pub groups: Vec<JsonMatchGroup>,
    /// Files that matched nothing
    pub unmatched: Vec<JsonUnmatched>,
    /// Reference digests that matched no file
    pub ref_orphans: Vec<String>,
    /// Legacy pool verification matches
    pub pool_matches: Vec<PoolMatch>,
    /// Per-file failures
    pub errors: Vec<JsonError>,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON document for a finished run.
    ///
    /// # Example
    ///
    /// ```
    /// use hashmatch::duplicates::ScanResult;
    /// use hashmatch::error::ExitCode;
    /// use hashmatch::output::JsonOutput;
    ///
    /// let output = JsonOutput::new(&ScanResult::new("blake3", 2), ExitCode::NoMatches);
    /// assert!(output.groups.is_empty());
    /// assert_eq!(output.summary.exit_code_name, "HM002");
    /// ```
    #[must_use]
    pub fn new(result: &ScanResult, exit_code: ExitCode) -> Self {
        Self {
            groups: result
                .matches
                .iter()
                .map(JsonMatchGroup::from_match_group)
                .collect(),
            unmatched: result
                .unmatched
                .iter()
                .map(|e| JsonUnmatched {
                    path: path_string(e),
                    digest: e.digest.clone(),
                    size: e.size,
                })
                .collect(),
            ref_orphans: result.ref_orphans.iter().map(|e| e.digest.clone()).collect(),
            pool_matches: result.pool_matches.clone(),
            errors: result.errors.iter().map(JsonError::from).collect(),
            summary: JsonSummary::from_result(result, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(entry: &Entry) -> String {
    entry.path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
