//! Optional callback slots fired by the walker.
//!
//! Callers opt into the notifications they need; unset slots cost nothing.
//! All callbacks run synchronously on the walking thread, in walk order.

use std::path::{Path, PathBuf};

use super::ScanError;

type PathFailedFn<'a> = Box<dyn FnMut(&str, &ScanError) + 'a>;
type SubtreeErrorFn<'a> = Box<dyn FnMut(&ScanError) + 'a>;
type PathFn<'a> = Box<dyn FnMut(&Path) + 'a>;
type FileFn<'a> = Box<dyn FnMut(PathBuf, u64) + 'a>;

/// Notification sinks for a scan.
///
/// # Example
///
/// ```
/// use dupfind::scanner::ScanEvents;
///
/// let mut found = Vec::new();
/// let events = ScanEvents::new().on_file_accepted(|path, size| found.push((path, size)));
/// # drop(events);
/// ```
#[derive(Default)]
pub struct ScanEvents<'a> {
    path_validation_failed: Option<PathFailedFn<'a>>,
    scan_subtree_error: Option<SubtreeErrorFn<'a>>,
    object_ignored: Option<PathFn<'a>>,
    file_accepted: Option<FileFn<'a>>,
    directory_accepted: Option<PathFn<'a>>,
}

impl std::fmt::Debug for ScanEvents<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEvents")
            .field("path_validation_failed", &self.path_validation_failed.is_some())
            .field("scan_subtree_error", &self.scan_subtree_error.is_some())
            .field("object_ignored", &self.object_ignored.is_some())
            .field("file_accepted", &self.file_accepted.is_some())
            .field("directory_accepted", &self.directory_accepted.is_some())
            .finish()
    }
}

impl<'a> ScanEvents<'a> {
    /// Create a set of events with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once for each scan root that fails validation.
    #[must_use]
    pub fn on_path_validation_failed(mut self, f: impl FnMut(&str, &ScanError) + 'a) -> Self {
        self.path_validation_failed = Some(Box::new(f));
        self
    }

    /// Called when a directory (or one of its entries) cannot be listed.
    #[must_use]
    pub fn on_scan_subtree_error(mut self, f: impl FnMut(&ScanError) + 'a) -> Self {
        self.scan_subtree_error = Some(Box::new(f));
        self
    }

    /// Called for every object rejected by the consider rules.
    #[must_use]
    pub fn on_object_ignored(mut self, f: impl FnMut(&Path) + 'a) -> Self {
        self.object_ignored = Some(Box::new(f));
        self
    }

    /// Called for every accepted file with its size.
    #[must_use]
    pub fn on_file_accepted(mut self, f: impl FnMut(PathBuf, u64) + 'a) -> Self {
        self.file_accepted = Some(Box::new(f));
        self
    }

    /// Called for every directory that passes the recurse-into rules.
    #[must_use]
    pub fn on_directory_accepted(mut self, f: impl FnMut(&Path) + 'a) -> Self {
        self.directory_accepted = Some(Box::new(f));
        self
    }

    pub(crate) fn path_validation_failed(&mut self, root: &str, error: &ScanError) {
        if let Some(f) = self.path_validation_failed.as_mut() {
            f(root, error);
        }
    }

    pub(crate) fn scan_subtree_error(&mut self, error: &ScanError) {
        if let Some(f) = self.scan_subtree_error.as_mut() {
            f(error);
        }
    }

    pub(crate) fn object_ignored(&mut self, path: &Path) {
        if let Some(f) = self.object_ignored.as_mut() {
            f(path);
        }
    }

    pub(crate) fn file_accepted(&mut self, path: PathBuf, size: u64) {
        if let Some(f) = self.file_accepted.as_mut() {
            f(path, size);
        }
    }

    pub(crate) fn directory_accepted(&mut self, path: &Path) {
        if let Some(f) = self.directory_accepted.as_mut() {
            f(path);
        }
    }
}
