//! Queue-driven directory walker.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which traverses scan roots
//! breadth-first with an explicit queue of pending directories, so stack depth
//! stays constant however deep the tree is. Each listed entry is classified
//! through the [`MaskEngine`]:
//!
//! 1. The full path and the base name are checked against the consider rules.
//!    Either can exclude the entry; excluded entries are reported through
//!    [`ScanEvents::on_object_ignored`] and excluded directories are not
//!    recursed into. Full path inclusions select files only, so a directory
//!    is pruned by path exclusions alone.
//! 2. Directories are queued. Those that also pass the recurse-into rules are
//!    reported through [`ScanEvents::on_directory_accepted`].
//! 3. Files are reported through [`ScanEvents::on_file_accepted`] when their
//!    parent directory passes the recurse-into rules.
//!
//! A directory that cannot be listed is reported through
//! [`ScanEvents::on_scan_subtree_error`] and skipped; the walk continues with
//! the next queued directory. Roots that are plain files bypass all rules.
//!
//! Name decisions are memoized per walker, keyed by rule pair and lowercased
//! subject. The walker also remembers the canonical path of every accepted
//! file, so a file reachable from overlapping roots or through a link is
//! reported once. Both live and die with the walker.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::mask::{Family, MaskEngine, Polarity, Target};
//! use dupfind::scanner::{ScanEvents, ScanRoot, Walker};
//! use std::path::Path;
//!
//! let mut masks = MaskEngine::new();
//! masks
//!     .add_rules(Family::Consider, Target::DirName, Polarity::Exclude, [".git", "target"])
//!     .unwrap();
//!
//! let root = ScanRoot::validate(Path::new(".")).unwrap();
//! let mut events = ScanEvents::new()
//!     .on_file_accepted(|path, size| println!("{}: {} bytes", path.display(), size));
//!
//! let stats = Walker::new(masks).walk(&root, &mut events);
//! println!("{} files accepted", stats.files_accepted);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::mask::{subject_of, Family, MaskEngine, Target};

use super::lister::{DirectoryLister, ListerKind};
use super::{FilesystemObject, RootKind, ScanError, ScanEvents, ScanRoot};

/// Counters collected during a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories successfully listed
    pub directories_listed: usize,
    /// Files reported as accepted
    pub files_accepted: usize,
    /// Directories reported as accepted
    pub directories_accepted: usize,
    /// Objects rejected by the consider rules
    pub ignored: usize,
    /// Files skipped because their directory is not searched in
    pub outside_search: usize,
    /// Directories or entries that could not be listed
    pub errors: usize,
    /// Files skipped because the same file was already accepted
    pub repeated: usize,
}

impl std::ops::AddAssign for WalkStats {
    fn add_assign(&mut self, other: Self) {
        self.directories_listed += other.directories_listed;
        self.files_accepted += other.files_accepted;
        self.directories_accepted += other.directories_accepted;
        self.ignored += other.ignored;
        self.outside_search += other.outside_search;
        self.errors += other.errors;
        self.repeated += other.repeated;
    }
}

/// Directory walker applying mask rules to every listed entry.
pub struct Walker {
    masks: MaskEngine,
    lister: Box<dyn DirectoryLister>,
    memo: HashMap<(Family, Target, String), bool>,
    seen: HashSet<PathBuf>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("masks", &self.masks)
            .field("lister", &self.lister.name())
            .field("memo_entries", &self.memo.len())
            .field("files_seen", &self.seen.len())
            .finish()
    }
}

impl Walker {
    /// Create a walker using the standard lister.
    #[must_use]
    pub fn new(masks: MaskEngine) -> Self {
        Self::with_lister_kind(masks, ListerKind::default())
    }

    /// Create a walker using the given lister implementation.
    #[must_use]
    pub fn with_lister_kind(masks: MaskEngine, kind: ListerKind) -> Self {
        Self::with_lister(masks, kind.build())
    }

    /// Create a walker around a custom lister.
    #[must_use]
    pub fn with_lister(masks: MaskEngine, lister: Box<dyn DirectoryLister>) -> Self {
        Self {
            masks,
            lister,
            memo: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// The mask configuration used by this walker.
    #[must_use]
    pub fn masks(&self) -> &MaskEngine {
        &self.masks
    }

    /// Walk every root in order.
    pub fn walk_all(&mut self, roots: &[ScanRoot], events: &mut ScanEvents<'_>) -> WalkStats {
        let mut stats = WalkStats::default();
        for root in roots {
            stats += self.walk(root, events);
        }
        stats
    }

    /// Walk a single root.
    ///
    /// File roots are reported once, as found, without consulting any rule.
    pub fn walk(&mut self, root: &ScanRoot, events: &mut ScanEvents<'_>) -> WalkStats {
        let mut stats = WalkStats::default();

        match root.kind() {
            RootKind::File => self.report_root_file(root.path(), events, &mut stats),
            RootKind::Directory => self.walk_directory(root.path(), events, &mut stats),
        }

        log::debug!(
            "Walked {} with {}: {} files, {} ignored, {} errors",
            root.path().display(),
            self.lister.name(),
            stats.files_accepted,
            stats.ignored,
            stats.errors
        );

        stats
    }

    fn report_root_file(
        &mut self,
        path: &Path,
        events: &mut ScanEvents<'_>,
        stats: &mut WalkStats,
    ) {
        match std::fs::metadata(path) {
            Ok(metadata) => self.accept_file(path.to_path_buf(), metadata.len(), events, stats),
            Err(source) => {
                let error = ScanError::ScanIo {
                    path: path.to_path_buf(),
                    source: Arc::new(source),
                };
                log::warn!("{}", error);
                stats.errors += 1;
                events.scan_subtree_error(&error);
            }
        }
    }

    fn walk_directory(&mut self, root: &Path, events: &mut ScanEvents<'_>, stats: &mut WalkStats) {
        let mut pending: VecDeque<PathBuf> = VecDeque::new();
        pending.push_back(root.to_path_buf());

        while let Some(dir) = pending.pop_front() {
            let listing = match self.lister.list(&dir) {
                Ok(listing) => listing,
                Err(source) => {
                    let error = ScanError::ScanIo {
                        path: dir,
                        source: Arc::new(source),
                    };
                    log::warn!("Cannot list directory: {}", error);
                    stats.errors += 1;
                    events.scan_subtree_error(&error);
                    continue;
                }
            };
            stats.directories_listed += 1;

            // Whether files directly inside `dir` are searched in
            let dir_searched = !self.is_outside_search(&FilesystemObject::directory(&dir));

            for entry in listing {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(source) => {
                        let error = ScanError::ScanIo {
                            path: dir.clone(),
                            source: Arc::new(source),
                        };
                        log::warn!("Cannot read entry: {}", error);
                        stats.errors += 1;
                        events.scan_subtree_error(&error);
                        continue;
                    }
                };

                let object = FilesystemObject::from(entry);

                if self.is_ignored(&object) {
                    log::trace!("Ignoring {}", object.path.display());
                    stats.ignored += 1;
                    events.object_ignored(&object.path);
                    continue;
                }

                if object.is_dir {
                    if !self.is_outside_search(&object) {
                        stats.directories_accepted += 1;
                        events.directory_accepted(&object.path);
                    }
                    pending.push_back(object.path);
                } else if dir_searched {
                    self.accept_file(object.path, object.size, events, stats);
                } else {
                    log::trace!("Not searched in: {}", object.path.display());
                    stats.outside_search += 1;
                }
            }
        }
    }

    /// Report a file unless the same file was accepted before.
    fn accept_file(
        &mut self,
        path: PathBuf,
        size: u64,
        events: &mut ScanEvents<'_>,
        stats: &mut WalkStats,
    ) {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !self.seen.insert(key) {
            log::debug!("Already found: {}", path.display());
            stats.repeated += 1;
            return;
        }
        stats.files_accepted += 1;
        events.file_accepted(path, size);
    }

    /// Whether the consider rules reject the object by path or by name.
    fn is_ignored(&mut self, object: &FilesystemObject) -> bool {
        if object.is_dir {
            self.is_path_excluded(object) || self.check(Family::Consider, Target::DirName, object)
        } else {
            self.check(Family::Consider, Target::FullPath, object)
                || self.check(Family::Consider, Target::FileName, object)
        }
    }

    fn is_path_excluded(&self, dir: &FilesystemObject) -> bool {
        if !self.masks.has_rules(Family::Consider, Target::FullPath) {
            return false;
        }
        self.masks.is_subject_excluded(
            Family::Consider,
            Target::FullPath,
            &subject_of(Target::FullPath, dir),
        )
    }

    /// Whether a directory fails the recurse-into rules.
    fn is_outside_search(&mut self, dir: &FilesystemObject) -> bool {
        self.check(Family::RecurseInto, Target::FullPath, dir)
            || self.check(Family::RecurseInto, Target::DirName, dir)
    }

    fn check(&mut self, family: Family, target: Target, object: &FilesystemObject) -> bool {
        if self.masks.size_excludes(target, object) {
            return true;
        }
        if !self.masks.has_rules(family, target) {
            return false;
        }

        let subject = subject_of(target, object);
        // Full paths never repeat within a walk
        if target == Target::FullPath {
            return self.masks.is_subject_ignored(family, target, &subject);
        }

        let key = (family, target, subject);
        if let Some(&ignored) = self.memo.get(&key) {
            return ignored;
        }

        let ignored = self.masks.is_subject_ignored(family, target, &key.2);
        self.memo.insert(key, ignored);
        ignored
    }
}
