//! File search with concurrent content and hash filtering.
//!
//! # Overview
//!
//! The walker runs on the calling thread and produces accepted files. What
//! happens to each file depends on the options:
//!
//! - no filter, no hash, no grouping: the file is reported immediately
//! - filter or hash needed: a task is spawned for the file, which runs the
//!   filter, computes the digest and (when not grouping) reports the file as
//!   soon as it passes
//! - grouping only: the file is collected and reported after the walk
//!
//! Every file is registered before its task starts. All tasks belong to one
//! rayon scope, and the end of that scope is the barrier: grouping and counts
//! are only computed once every filter and hash result is final. Reports from
//! concurrent tasks are serialized through a console lock, so `on_match`
//! never runs twice at the same time.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::file::{FileAccessor, FilterCriteria};
//! use dupfind::mask::{Family, MaskEngine, Polarity, Target};
//! use dupfind::scanner::ScanEvents;
//! use dupfind::search::{FileSearch, SearchOptions};
//! use std::path::PathBuf;
//!
//! let mut masks = MaskEngine::new();
//! masks
//!     .add_rules(Family::Consider, Target::FileName, Polarity::Include, ["*.log"])
//!     .unwrap();
//!
//! let options = SearchOptions::default()
//!     .with_criteria(FilterCriteria::new().with_content("panic").unwrap());
//! let search = FileSearch::new(options, masks);
//!
//! let outcome = search
//!     .run(&[PathBuf::from(".")], &mut ScanEvents::new(), &|file: &FileAccessor| {
//!         println!("{}", file.path().display())
//!     })
//!     .unwrap();
//! println!("{} files found", outcome.matched.len());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::duplicates::io_pool;
use crate::file::{Digest, FileAccessor, FilterCriteria, HashAlgorithm, HEAP_THRESHOLD};
use crate::mask::MaskEngine;
use crate::scanner::{validate_roots, ListerKind, ScanError, ScanEvents, WalkStats, Walker};

/// How found files are grouped for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    /// Lowercase file extension
    Extension,
    /// Exact size
    Size,
    /// Content digest
    Hash,
}

/// Key of one output group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
    /// Lowercase extension without the dot; empty when there is none
    Extension(String),
    /// Size in bytes
    Size(u64),
    /// Digest, or `None` when hashing failed
    Hash(Option<Digest>),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(ext) if ext.is_empty() => f.write_str("(no extension)"),
            Self::Extension(ext) => write!(f, ".{}", ext),
            Self::Size(size) => write!(f, "{}", bytesize::ByteSize::b(*size)),
            Self::Hash(Some(digest)) => write!(f, "{}", digest),
            Self::Hash(None) => f.write_str("hash failed"),
        }
    }
}

impl GroupKey {
    /// The key of `file` under `by`.
    #[must_use]
    pub fn of(file: &FileAccessor, by: GroupBy) -> Self {
        match by {
            GroupBy::Extension => Self::Extension(
                file.path()
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default(),
            ),
            GroupBy::Size => Self::Size(file.size()),
            GroupBy::Hash => Self::Hash(file.hash().cloned()),
        }
    }
}

/// Search configuration beyond the masks.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Content needle and hash allow list
    pub criteria: FilterCriteria,
    /// Compute and report each file's digest
    pub print_hash: bool,
    /// Group the output instead of streaming it
    pub group_by: Option<GroupBy>,
    /// Report accepted directories instead of files
    pub directories_only: bool,
    /// Digest algorithm
    pub hash_algorithm: HashAlgorithm,
    /// Size boundary between buffered and mapped access
    pub heap_threshold: u64,
    /// Worker threads; 0 lets rayon decide
    pub threads: usize,
    /// Directory listing implementation
    pub lister: ListerKind,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::new(),
            print_hash: false,
            group_by: None,
            directories_only: false,
            hash_algorithm: HashAlgorithm::default(),
            heap_threshold: HEAP_THRESHOLD,
            threads: 0,
            lister: ListerKind::default(),
        }
    }
}

impl SearchOptions {
    /// Set the filter criteria.
    #[must_use]
    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Compute digests for reporting.
    #[must_use]
    pub fn with_print_hash(mut self, enabled: bool) -> Self {
        self.print_hash = enabled;
        self
    }

    /// Group the output.
    #[must_use]
    pub fn with_group_by(mut self, group_by: Option<GroupBy>) -> Self {
        self.group_by = group_by;
        self
    }

    /// Search for directories instead of files.
    #[must_use]
    pub fn with_directories_only(mut self, enabled: bool) -> Self {
        self.directories_only = enabled;
        self
    }

    /// Select the digest algorithm.
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Set the heap threshold.
    #[must_use]
    pub fn with_heap_threshold(mut self, threshold: u64) -> Self {
        self.heap_threshold = threshold;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Select the lister.
    #[must_use]
    pub fn with_lister(mut self, lister: ListerKind) -> Self {
        self.lister = lister;
        self
    }

    /// Whether files must pass content or hash criteria.
    #[must_use]
    pub fn is_filtering(&self) -> bool {
        self.criteria.is_active()
    }

    /// Whether output is grouped after the walk.
    #[must_use]
    pub fn is_grouping(&self) -> bool {
        self.group_by.is_some()
    }

    /// Whether digests are needed for filtering, reporting or grouping.
    #[must_use]
    pub fn needs_hash(&self) -> bool {
        self.print_hash || !self.criteria.hashes().is_empty() || self.group_by == Some(GroupBy::Hash)
    }

    fn needs_task(&self) -> bool {
        self.is_filtering() || self.needs_hash()
    }
}

/// Everything a search produced.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Files that passed every criterion, in walk order
    pub matched: Vec<FileAccessor>,
    /// Directories accepted by the recurse-into rules, in walk order
    pub directories: Vec<PathBuf>,
    /// Files rejected because they could not be read
    pub unreadable: Vec<FileAccessor>,
    /// Directories that could not be listed
    pub scan_errors: Vec<ScanError>,
    /// Walker counters
    pub stats: WalkStats,
}

impl SearchOutcome {
    /// Group matched files. Groups are ordered by key, members by walk order.
    #[must_use]
    pub fn grouped(&self, by: GroupBy) -> BTreeMap<GroupKey, Vec<&FileAccessor>> {
        let mut groups: BTreeMap<GroupKey, Vec<&FileAccessor>> = BTreeMap::new();
        for file in &self.matched {
            groups.entry(GroupKey::of(file, by)).or_default().push(file);
        }
        groups
    }

    /// Number of reported objects: directories in directory mode, files
    /// otherwise.
    #[must_use]
    pub fn found_count(&self, directories_only: bool) -> usize {
        if directories_only {
            self.directories.len()
        } else {
            self.matched.len()
        }
    }

    /// Whether any file or directory could not be read, including matched
    /// files whose digest could not be computed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.scan_errors.is_empty()
            || !self.unreadable.is_empty()
            || self.matched.iter().any(|file| file.last_error().is_some())
    }
}

/// Errors that abort a search.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// A scan root failed validation.
    #[error(transparent)]
    InvalidRoot(#[from] ScanError),

    /// The worker pool could not be created.
    #[error("Cannot start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

type SharedFile = Arc<Mutex<FileAccessor>>;

/// Runs a search over a set of roots.
#[derive(Debug)]
pub struct FileSearch {
    options: SearchOptions,
    masks: MaskEngine,
}

impl FileSearch {
    /// Create a search.
    #[must_use]
    pub fn new(options: SearchOptions, masks: MaskEngine) -> Self {
        Self { options, masks }
    }

    /// The search options.
    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Validate the roots and run the search.
    ///
    /// `on_match` is called for every passing file as soon as its result is
    /// known, unless output is grouped. Invalid roots are reported through
    /// `events` before the search is refused.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidRoot`] with the first root that failed
    /// - [`SearchError::ThreadPool`] if the worker pool cannot be built
    pub fn run(
        &self,
        roots: &[PathBuf],
        events: &mut ScanEvents<'_>,
        on_match: &(dyn Fn(&FileAccessor) + Sync),
    ) -> Result<SearchOutcome, SearchError> {
        let roots = validate_roots(roots, events)?;
        let pool = io_pool(self.options.threads)?;

        let registry: Mutex<Vec<SharedFile>> = Mutex::new(Vec::new());
        let console = Mutex::new(());
        let mut directories = Vec::new();
        let mut scan_errors = Vec::new();

        let options = &self.options;
        let masks = &self.masks;
        let registry_ref = &registry;
        let console_ref = &console;
        let directories_ref = &mut directories;
        let scan_errors_ref = &mut scan_errors;

        log::info!(
            "Searching {} roots (filtering: {}, hashing: {}, grouping: {})",
            roots.len(),
            options.is_filtering(),
            options.needs_hash(),
            options.is_grouping()
        );

        let stats = pool.install(move || {
            rayon::scope(move |scope| {
                let mut walker = Walker::with_lister_kind(masks.clone(), options.lister);
                let mut events = ScanEvents::new()
                    .on_directory_accepted(move |path| directories_ref.push(path.to_path_buf()))
                    .on_scan_subtree_error(move |e| scan_errors_ref.push(e.clone()))
                    .on_file_accepted(move |path, size| {
                        if options.directories_only {
                            return;
                        }
                        let file = FileAccessor::new(path, size).with_heap_threshold(options.heap_threshold);

                        if !options.needs_task() {
                            if !options.is_grouping() {
                                let _console = console_ref.lock().unwrap_or_else(PoisonError::into_inner);
                                on_match(&file);
                            }
                            lock(registry_ref).push(Arc::new(Mutex::new(file)));
                            return;
                        }

                        let file = Arc::new(Mutex::new(file));
                        let task_file = Arc::clone(&file);
                        let mut registry = lock(registry_ref);
                        registry.push(file);
                        scope.spawn(move |_| evaluate(&task_file, options, console_ref, on_match));
                    });
                walker.walk_all(&roots, &mut events)
            })
        });

        let mut matched = Vec::new();
        let mut unreadable = Vec::new();
        for file in registry
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .filter_map(Arc::into_inner)
            .map(|file| file.into_inner().unwrap_or_else(PoisonError::into_inner))
        {
            match file.filter_result() {
                Some(false) if file.last_error().is_some() => unreadable.push(file),
                Some(false) => {}
                _ => matched.push(file),
            }
        }

        log::info!(
            "Search complete: {} files matched, {} directories accepted, {} unreadable, {} errors",
            matched.len(),
            directories.len(),
            unreadable.len(),
            scan_errors.len()
        );

        Ok(SearchOutcome {
            matched,
            directories,
            unreadable,
            scan_errors,
            stats,
        })
    }
}

fn lock(registry: &Mutex<Vec<SharedFile>>) -> std::sync::MutexGuard<'_, Vec<SharedFile>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Filter and hash one file, then report it if it passes and output is not
/// grouped.
fn evaluate(
    file: &SharedFile,
    options: &SearchOptions,
    console: &Mutex<()>,
    on_match: &(dyn Fn(&FileAccessor) + Sync),
) {
    let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);

    if options.is_filtering() {
        file.matches_filter(&options.criteria, &options.hash_algorithm);
    }

    if options.needs_hash() && file.filter_result() != Some(false) {
        if let Err(e) = file.compute_hash(&options.hash_algorithm) {
            log::debug!("Cannot hash {}: {}", file.path().display(), e);
        }
    }

    if !options.is_grouping() && file.filter_result() != Some(false) {
        let _console = console.lock().unwrap_or_else(PoisonError::into_inner);
        on_match(&file);
    }
}
