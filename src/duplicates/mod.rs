//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file bucketing
//! - Partitioning same-size buckets into byte-identical clusters
//! - Duplicate group and scan result management

pub mod finder;
pub mod groups;

pub use finder::{
    find_equal_groups, io_pool, partition_bucket, DuplicateFinder, DuplicateReport, FinderConfig,
    FinderError, ScanSummary,
};
pub use groups::{group_by_size, DuplicateGroup, GroupingStats, ScanResult, SizeBuckets};
