//! Duplicate finder: walk, bucket by size, partition buckets by content.
//!
//! # Overview
//!
//! The pipeline has two phases:
//! 1. **Walk**: every root is walked with the configured masks and accepted
//!    files are bucketed by size (see [`crate::duplicates::groups`])
//! 2. **Partition**: each bucket with two or more members is split into
//!    maximal clusters of byte-identical files
//!
//! Partitioning keeps one representative per cluster. Each new file is
//! compared against the representatives in order and joins the first cluster
//! whose representative is identical, or starts a new one. Content equality
//! is an equivalence relation, so one comparison per existing cluster is
//! enough: a bucket of `n` files split into `k` clusters costs at most `n * k`
//! comparisons rather than `n²`.
//!
//! Files that cannot be opened are moved to the failure list with their own
//! error. If a representative fails, the next member of its cluster takes
//! over.
//!
//! Buckets are independent and are partitioned in parallel on a dedicated
//! I/O pool.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{DuplicateFinder, FinderConfig};
//! use dupfind::mask::MaskEngine;
//! use dupfind::scanner::ScanEvents;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default(), MaskEngine::new());
//! let report = finder
//!     .find_duplicates(&[PathBuf::from(".")], &mut ScanEvents::new())
//!     .unwrap();
//!
//! println!("Found {} duplicate groups", report.groups.len());
//! println!("Reclaimable space: {}", report.summary.reclaimable_display());
//! ```

use std::path::PathBuf;

use rayon::prelude::*;

use crate::file::{FileAccessor, HashAlgorithm, HEAP_THRESHOLD};
use crate::mask::MaskEngine;
use crate::scanner::{validate_roots, ListerKind, ScanError, ScanEvents, ScanRoot, Walker};

use super::groups::{DuplicateGroup, GroupingStats, ScanResult, SizeBuckets};

/// Build the pool used for file I/O. `0` lets rayon pick the thread count.
///
/// # Errors
///
/// Returns the rayon error if the pool cannot be created.
pub fn io_pool(threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("dupfind-io-{}", i));
    if threads > 0 {
        builder = builder.num_threads(threads);
    }
    builder.build()
}

/// Split one size bucket into duplicate groups.
///
/// Returns the groups with two or more members and the files that could not
/// be opened. Clusters with a single member are dropped.
#[must_use]
pub fn partition_bucket(size: u64, files: Vec<FileAccessor>) -> (Vec<DuplicateGroup>, Vec<FileAccessor>) {
    let mut clusters: Vec<Vec<FileAccessor>> = Vec::new();
    let mut failed = Vec::new();

    'files: for mut file in files {
        let mut index = 0;
        while index < clusters.len() {
            let cluster = &mut clusters[index];
            let representative = &mut cluster[0];

            if file.compare_to(representative) {
                cluster.push(file);
                continue 'files;
            }
            if file.last_error().is_some() {
                log::debug!("Cannot compare {}", file.path().display());
                failed.push(file);
                continue 'files;
            }
            if representative.last_error().is_some() {
                // Promote the next member and retry the same cluster
                failed.push(cluster.remove(0));
                if cluster.is_empty() {
                    clusters.remove(index);
                }
                continue;
            }

            index += 1;
        }
        clusters.push(vec![file]);
    }

    let groups = clusters
        .into_iter()
        .filter(|cluster| cluster.len() > 1)
        .map(|cluster| DuplicateGroup::new(size, cluster))
        .collect();

    (groups, failed)
}

/// Partition every bucket on the current rayon pool.
///
/// Buckets with fewer than two members are skipped. Groups come back in
/// ascending size order.
#[must_use]
pub fn find_equal_groups(by_size: SizeBuckets) -> (Vec<DuplicateGroup>, Vec<FileAccessor>) {
    let partitions: Vec<_> = by_size
        .into_par_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(size, files)| partition_bucket(size, files))
        .collect();

    let mut groups = Vec::new();
    let mut failed = Vec::new();
    for (bucket_groups, bucket_failed) in partitions {
        groups.extend(bucket_groups);
        failed.extend(bucket_failed);
    }
    (groups, failed)
}

/// Configuration for the duplicate finder.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Number of I/O threads; 0 lets rayon decide.
    pub io_threads: usize,
    /// Size boundary between buffered and mapped access.
    pub heap_threshold: u64,
    /// Directory listing implementation.
    pub lister: ListerKind,
    /// Hash each group with this algorithm, if set.
    pub group_hash: Option<HashAlgorithm>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 0,
            heap_threshold: HEAP_THRESHOLD,
            lister: ListerKind::default(),
            group_hash: None,
        }
    }
}

impl FinderConfig {
    /// Set the I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set the heap threshold.
    #[must_use]
    pub fn with_heap_threshold(mut self, threshold: u64) -> Self {
        self.heap_threshold = threshold;
        self
    }

    /// Select the lister.
    #[must_use]
    pub fn with_lister(mut self, lister: ListerKind) -> Self {
        self.lister = lister;
        self
    }

    /// Hash every group once detection is done.
    #[must_use]
    pub fn with_group_hash(mut self, algorithm: Option<HashAlgorithm>) -> Self {
        self.group_hash = algorithm;
        self
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files accepted by the masks
    pub found: usize,
    /// Files sharing their size with another file
    pub ready_to_compare: usize,
    /// Objects rejected by the masks
    pub ignored: usize,
    /// Files that could not be read
    pub failed: usize,
    /// Directories that could not be listed
    pub scan_errors: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Duplicate files, excluding one original per group
    pub duplicate_files: usize,
    /// Space taken by the duplicate files
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: std::time::Duration,
}

impl ScanSummary {
    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Whether anything went wrong while scanning.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.scan_errors > 0
    }
}

/// Result of a full duplicate scan.
#[derive(Debug)]
pub struct DuplicateReport {
    /// Duplicate groups in ascending size order
    pub groups: Vec<DuplicateGroup>,
    /// Files that could not be read, each with its own error
    pub failed: Vec<FileAccessor>,
    /// Objects rejected by the masks
    pub ignored: Vec<PathBuf>,
    /// Directories that could not be listed
    pub scan_errors: Vec<ScanError>,
    /// Counters
    pub summary: ScanSummary,
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// A scan root failed validation.
    #[error(transparent)]
    InvalidRoot(#[from] ScanError),

    /// The I/O pool could not be created.
    #[error("Cannot start I/O threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Duplicate finder that walks roots and partitions the files found.
///
/// # Example
///
/// ```no_run
/// use dupfind::duplicates::{DuplicateFinder, FinderConfig};
/// use dupfind::mask::{Family, MaskEngine, Polarity, Target};
/// use dupfind::scanner::ScanRoot;
/// use std::path::Path;
///
/// let mut masks = MaskEngine::new();
/// masks
///     .add_rules(Family::Consider, Target::FileName, Polarity::Include, ["*.jpg"])
///     .unwrap();
///
/// let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4), masks);
/// let root = ScanRoot::validate(Path::new("photos")).unwrap();
///
/// let scan = finder.scan(&[root]);
/// println!("{} files found, {} ignored", scan.found_count(), scan.ignored_count());
/// let report = finder.detect(scan).unwrap();
/// println!("{} groups", report.groups.len());
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    masks: MaskEngine,
}

impl DuplicateFinder {
    /// Create a finder with the given configuration and masks.
    #[must_use]
    pub fn new(config: FinderConfig, masks: MaskEngine) -> Self {
        Self { config, masks }
    }

    /// The finder configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk validated roots and bucket the accepted files by size.
    #[must_use]
    pub fn scan(&self, roots: &[ScanRoot]) -> ScanResult {
        let mut result = ScanResult::default();
        let mut accepted = Vec::new();
        let mut ignored = Vec::new();
        let mut scan_errors = Vec::new();

        let threshold = self.config.heap_threshold;
        let mut walker = Walker::with_lister_kind(self.masks.clone(), self.config.lister);
        let stats = {
            let mut events = ScanEvents::new()
                .on_file_accepted(|path, size| {
                    accepted.push(FileAccessor::new(path, size).with_heap_threshold(threshold));
                })
                .on_object_ignored(|path| ignored.push(path.to_path_buf()))
                .on_scan_subtree_error(|e| scan_errors.push(e.clone()));
            walker.walk_all(roots, &mut events)
        };

        for file in accepted {
            result.add_file(file);
        }
        result.ignored = ignored;
        result.scan_errors = scan_errors;
        result.stats = stats;

        log::info!(
            "Found {} files, {} ready to compare, {} ignored",
            result.found_count(),
            result.ready_to_compare(),
            result.ignored_count()
        );

        result
    }

    /// Partition the scanned buckets into duplicate groups.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if the I/O pool cannot be built.
    pub fn detect(&self, scan: ScanResult) -> Result<DuplicateReport, FinderError> {
        let start_time = std::time::Instant::now();
        let grouping = GroupingStats::of(&scan.found_by_size);

        let mut summary = ScanSummary {
            found: grouping.total_files,
            ready_to_compare: grouping.potential_duplicates,
            ignored: scan.ignored.len(),
            scan_errors: scan.scan_errors.len(),
            ..ScanSummary::default()
        };

        let ScanResult {
            found_by_size,
            ignored,
            failed: mut already_failed,
            scan_errors,
            ..
        } = scan;

        log::info!(
            "Comparing {} files in {} buckets",
            grouping.potential_duplicates,
            found_by_size.values().filter(|files| files.len() > 1).count()
        );

        let pool = io_pool(self.config.io_threads)?;
        let group_hash = self.config.group_hash;
        let (mut groups, failed) = pool.install(|| {
            let (mut groups, failed) = find_equal_groups(found_by_size);
            if let Some(algorithm) = group_hash {
                groups.par_iter_mut().for_each(|group| {
                    group.compute_hash(&algorithm);
                });
            }
            (groups, failed)
        });
        already_failed.extend(failed);
        groups.sort_by_key(|group| group.size);

        summary.failed = already_failed.len();
        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(|g| g.len() - 1).sum();
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Comparison complete: {} duplicate groups, {} duplicate files, {} reclaimable, {} failed",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.failed
        );

        Ok(DuplicateReport {
            groups,
            failed: already_failed,
            ignored,
            scan_errors,
            summary,
        })
    }

    /// Validate the roots, walk them and partition the files found.
    ///
    /// Every invalid root is reported through
    /// [`ScanEvents::on_path_validation_failed`] before the run is refused.
    ///
    /// # Errors
    ///
    /// - [`FinderError::InvalidRoot`] with the first root that failed
    /// - [`FinderError::ThreadPool`] if the I/O pool cannot be built
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
        events: &mut ScanEvents<'_>,
    ) -> Result<DuplicateReport, FinderError> {
        let roots = validate_roots(roots, events)?;
        let start_time = std::time::Instant::now();

        let scan = self.scan(&roots);
        let mut report = self.detect(scan)?;
        report.summary.scan_duration = start_time.elapsed();

        Ok(report)
    }
}
