//! Exit codes and structured error reporting.

use serde::Serialize;

use crate::duplicates::ScanResult;

/// Exit codes for hashmatch.
///
/// - 0: Success (completed, at least one match)
/// - 1: General error (unexpected failure, unsupported algorithm)
/// - 2: No matches (completed, nothing matched)
/// - 3: Partial success (completed, some files could not be digested)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: matches were found.
    Success = 0,
    /// General error: the run could not complete.
    GeneralError = 1,
    /// No matches: every file was unique and no reference matched.
    NoMatches = 2,
    /// Partial success: the run completed with per-file errors.
    PartialSuccess = 3,
    /// Interrupted: the run was cancelled by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HM000",
            Self::GeneralError => "HM001",
            Self::NoMatches => "HM002",
            Self::PartialSuccess => "HM003",
            Self::Interrupted => "HM130",
        }
    }

    /// Pick the exit code for a finished run.
    ///
    /// Interruption wins over per-file errors, which win over the match
    /// outcome.
    #[must_use]
    pub fn from_result(result: &ScanResult) -> Self {
        if result.interrupted {
            Self::Interrupted
        } else if !result.errors.is_empty() {
            Self::PartialSuccess
        } else if result.has_matches() {
            Self::Success
        } else {
            Self::NoMatches
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HM001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
