//! Match detection module.
//!
//! This module provides functionality for:
//! - Grouping digested files by identical content
//! - Matching files against a pool of reference digests
//! - Running a full digest-and-classify pass ([`DigestFinder`])

pub mod finder;
pub mod groups;

pub use finder::{DigestFinder, FinderConfig, FinderError, ScanResult};
pub use groups::{
    group_pool_results, group_results, legacy_pool_matches, normalize_reference, MatchGroup,
    PoolGrouping, PoolMatch,
};
