//! Size buckets, scan results and duplicate groups.
//!
//! # Overview
//!
//! Files accepted by the walker are bucketed by exact size. Only buckets with
//! more than one member can hold duplicates; all others are skipped without
//! opening a single file.
//!
//! # Example
//!
//! ```
//! use dupfind::duplicates::{group_by_size, GroupingStats};
//! use dupfind::file::FileAccessor;
//!
//! let files = vec![
//!     FileAccessor::new("/file1.txt", 1024),
//!     FileAccessor::new("/file2.txt", 1024),
//!     FileAccessor::new("/file3.txt", 2048),
//! ];
//!
//! let (buckets, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(buckets.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::file::{ContentHasher, Digest, FileAccessor};
use crate::scanner::{ScanError, WalkStats};

/// Files keyed by exact size, in ascending size order.
pub type SizeBuckets = BTreeMap<u64, Vec<FileAccessor>>;

/// Statistics from bucketing files by size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files bucketed
    pub total_files: usize,
    /// Number of distinct sizes
    pub unique_sizes: usize,
    /// Files in buckets with two or more members
    pub potential_duplicates: usize,
    /// Files alone in their bucket
    pub eliminated_unique: usize,
}

impl GroupingStats {
    /// Compute statistics for existing buckets.
    #[must_use]
    pub fn of(buckets: &SizeBuckets) -> Self {
        let mut stats = Self {
            unique_sizes: buckets.len(),
            ..Self::default()
        };
        for files in buckets.values() {
            stats.total_files += files.len();
            if files.len() > 1 {
                stats.potential_duplicates += files.len();
            } else {
                stats.eliminated_unique += files.len();
            }
        }
        stats
    }
}

/// Bucket files by size.
#[must_use]
pub fn group_by_size(files: impl IntoIterator<Item = FileAccessor>) -> (SizeBuckets, GroupingStats) {
    let mut buckets = SizeBuckets::new();
    for file in files {
        buckets.entry(file.size()).or_default().push(file);
    }
    let stats = GroupingStats::of(&buckets);

    log::debug!(
        "Size grouping: {} files, {} unique sizes, {} potential duplicates",
        stats.total_files,
        stats.unique_sizes,
        stats.potential_duplicates
    );

    (buckets, stats)
}

/// Everything collected while walking the roots.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Accepted files keyed by size
    pub found_by_size: SizeBuckets,
    /// Objects rejected by the mask rules, in walk order
    pub ignored: Vec<PathBuf>,
    /// Files that could not be read
    pub failed: Vec<FileAccessor>,
    /// Directories that could not be listed
    pub scan_errors: Vec<ScanError>,
    /// Walker counters
    pub stats: WalkStats,
}

impl ScanResult {
    /// Add an accepted file to its size bucket.
    pub fn add_file(&mut self, file: FileAccessor) {
        self.found_by_size.entry(file.size()).or_default().push(file);
    }

    /// Number of accepted files.
    #[must_use]
    pub fn found_count(&self) -> usize {
        self.found_by_size.values().map(Vec::len).sum()
    }

    /// Number of files that share their size with at least one other file.
    #[must_use]
    pub fn ready_to_compare(&self) -> usize {
        self.found_by_size
            .values()
            .filter(|files| files.len() > 1)
            .map(Vec::len)
            .sum()
    }

    /// Number of objects rejected by the mask rules.
    #[must_use]
    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }
}

/// A set of files with identical size and byte content.
#[derive(Debug)]
pub struct DuplicateGroup {
    /// Size shared by every member
    pub size: u64,
    /// Members in discovery order; the first one is the representative
    pub files: Vec<FileAccessor>,
    /// Content digest, when requested
    pub hash: Option<Digest>,
}

impl DuplicateGroup {
    /// Create a group from cluster members.
    #[must_use]
    pub fn new(size: u64, files: Vec<FileAccessor>) -> Self {
        Self {
            size,
            files,
            hash: None,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Space taken by the copies beyond the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * (self.files.len().saturating_sub(1)) as u64
    }

    /// Paths of all members.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(FileAccessor::path)
    }

    /// Hash the representative and store the digest on the group.
    ///
    /// Members are byte-identical, so one digest stands for all of them.
    pub fn compute_hash(&mut self, hasher: &dyn ContentHasher) -> Option<&Digest> {
        if self.hash.is_none() {
            let first = self.files.first_mut()?;
            match first.compute_hash(hasher) {
                Ok(digest) => self.hash = Some(digest),
                Err(e) => log::warn!("Cannot hash group of {} bytes: {}", self.size, e),
            }
        }
        self.hash.as_ref()
    }
}
