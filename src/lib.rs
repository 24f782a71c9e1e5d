//! hashmatch - parallel file digesting and content matching
//!
//! Digests a caller-supplied list of files on a bounded worker pool, groups
//! files whose content digests are identical, and optionally matches them
//! against a pool of known reference digests.

pub mod app;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

pub use app::run_app;
