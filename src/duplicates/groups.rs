//! Digest grouping and reference pool matching.
//!
//! # Overview
//!
//! Entries are bucketed by digest in the order each digest is first seen, so
//! the output is reproducible for a given input order. Failed entries never
//! take part in grouping.
//!
//! ## Plain grouping
//!
//! Buckets with two or more files become [`MatchGroup`]s; single files are
//! unmatched.
//!
//! ## Pool matching
//!
//! Reference digests supplied by the caller join the bucket of the same
//! digest, after its files. A reference with no file counterpart is a
//! reference orphan.
//!
//! # Example
//!
//! ```
//! use hashmatch::duplicates::group_results;
//! use hashmatch::scanner::Entry;
//! use std::path::PathBuf;
//!
//! let entries = vec![
//!     Entry::success(PathBuf::from("/a"), "aa".into(), 1, "sha256"),
//!     Entry::success(PathBuf::from("/b"), "aa".into(), 1, "sha256"),
//!     Entry::success(PathBuf::from("/c"), "cc".into(), 1, "sha256"),
//! ];
//!
//! let (groups, unmatched) = group_results(&entries);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].count, 2);
//! assert_eq!(unmatched.len(), 1);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::scanner::Entry;

/// Entries sharing one digest.
#[derive(Debug, Clone)]
pub struct MatchGroup {
    /// The shared digest
    pub digest: String,
    /// Members in encounter order, files before references
    pub entries: Vec<Entry>,
    /// Number of members (always 2 or more)
    pub count: usize,
}

impl MatchGroup {
    /// Build a group from a bucket.
    #[must_use]
    pub fn new(digest: String, entries: Vec<Entry>) -> Self {
        debug_assert!(entries.len() >= 2, "match groups need at least two members");
        let count = entries.len();
        Self {
            digest,
            entries,
            count,
        }
    }

    /// Iterate over file members.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_reference)
    }

    /// Iterate over reference members.
    pub fn references(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_reference)
    }

    /// Total bytes of the file members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files().map(|e| e.size).sum()
    }
}

/// A file verified against a reference digest by the legacy fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolMatch {
    /// File that matched
    pub path: PathBuf,
    /// Digest computed for the file
    pub digest: String,
    /// Reference digest it matched
    pub reference: String,
    /// Algorithm used
    pub algorithm: String,
}

/// Output of [`group_pool_results`].
#[derive(Debug, Clone, Default)]
pub struct PoolGrouping {
    /// Groups of files and/or references sharing a digest
    pub matches: Vec<MatchGroup>,
    /// Files whose digest matched nothing
    pub file_orphans: Vec<Entry>,
    /// References whose digest matched no file
    pub ref_orphans: Vec<Entry>,
}

/// Digest buckets in first-seen order.
///
/// A vector of buckets plus a digest-to-slot index.
#[derive(Debug, Default)]
struct DigestBuckets {
    buckets: Vec<(String, Vec<Entry>)>,
    index: HashMap<String, usize>,
}

impl DigestBuckets {
    /// Bucket every successful entry; failures are skipped.
    fn from_entries(entries: &[Entry]) -> Self {
        let mut buckets = Self::default();
        for entry in entries.iter().filter(|e| e.is_ok()) {
            buckets.push(entry.clone());
        }
        buckets
    }

    fn push(&mut self, entry: Entry) {
        match self.index.get(&entry.digest) {
            Some(&slot) => self.buckets[slot].1.push(entry),
            None => {
                self.index.insert(entry.digest.clone(), self.buckets.len());
                self.buckets.push((entry.digest.clone(), vec![entry]));
            }
        }
    }

    /// Append to an existing bucket. Returns false if no bucket has `digest`.
    fn attach(&mut self, digest: &str, entry: Entry) -> bool {
        match self.index.get(digest) {
            Some(&slot) => {
                self.buckets[slot].1.push(entry);
                true
            }
            None => false,
        }
    }

    /// Split into groups (2+ members) and singles, preserving order.
    fn split(self) -> (Vec<MatchGroup>, Vec<Entry>) {
        let mut groups = Vec::new();
        let mut singles = Vec::new();

        for (digest, mut members) in self.buckets {
            if members.len() >= 2 {
                log::debug!("Match group {}: {} members", digest, members.len());
                groups.push(MatchGroup::new(digest, members));
            } else if let Some(single) = members.pop() {
                singles.push(single);
            }
        }

        (groups, singles)
    }
}

/// Normalize a reference digest for comparison.
#[must_use]
pub fn normalize_reference(digest: &str) -> String {
    digest.trim().to_ascii_lowercase()
}

/// Partition entries into match groups and unmatched entries.
///
/// Failed entries appear in neither output.
///
/// # Returns
///
/// A tuple of:
/// - `Vec<MatchGroup>` - Digests shared by two or more files, first-seen order
/// - `Vec<Entry>` - Files whose digest is unique
#[must_use]
pub fn group_results(entries: &[Entry]) -> (Vec<MatchGroup>, Vec<Entry>) {
    let (groups, unmatched) = DigestBuckets::from_entries(entries).split();

    log::debug!(
        "Grouping complete: {} groups, {} unmatched",
        groups.len(),
        unmatched.len()
    );

    (groups, unmatched)
}

/// Match entries against a pool of reference digests.
///
/// # Arguments
///
/// * `entries` - Digested files, in caller order
/// * `references` - Reference digests; compared case-insensitively
/// * `algorithm` - Algorithm recorded on the reference entries
///
/// Every reference ends up in exactly one place: inside a match group or
/// in `ref_orphans`.
#[must_use]
pub fn group_pool_results(entries: &[Entry], references: &[String], algorithm: &str) -> PoolGrouping {
    let mut buckets = DigestBuckets::from_entries(entries);
    let mut ref_orphans = Vec::new();

    for reference in references {
        let digest = normalize_reference(reference);
        let entry = Entry::reference(&digest, algorithm);
        if !buckets.attach(&digest, entry.clone()) {
            log::debug!("Reference {} matched no file", digest);
            ref_orphans.push(entry);
        }
    }

    let (matches, file_orphans) = buckets.split();

    log::debug!(
        "Pool matching complete: {} groups, {} file orphans, {} reference orphans",
        matches.len(),
        file_orphans.len(),
        ref_orphans.len()
    );

    PoolGrouping {
        matches,
        file_orphans,
        ref_orphans,
    }
}

/// Record every successful entry whose digest equals a reference,
/// ignoring ASCII case.
///
/// Kept for consumers of the older pool verification output; the scan
/// result only fills it when pool matching produced no groups.
#[must_use]
pub fn legacy_pool_matches(entries: &[Entry], references: &[String], algorithm: &str) -> Vec<PoolMatch> {
    let mut matches = Vec::new();

    for entry in entries.iter().filter(|e| e.is_ok() && !e.is_reference) {
        for reference in references {
            let reference = reference.trim();
            if entry.digest.eq_ignore_ascii_case(reference) {
                matches.push(PoolMatch {
                    path: entry.path.clone(),
                    digest: entry.digest.clone(),
                    reference: reference.to_string(),
                    algorithm: algorithm.to_string(),
                });
            }
        }
    }

    matches
}
