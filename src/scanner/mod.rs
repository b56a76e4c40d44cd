//! Scanner module for root validation and directory traversal.
//!
//! This module provides functionality for:
//! - Validating scan roots once, before any walking starts
//! - Listing directories through a swappable [`DirectoryLister`]
//! - Walking each root with an explicit directory queue
//! - Reporting accepted and ignored objects through [`ScanEvents`]
//!
//! # Architecture
//!
//! - [`lister`]: one-level directory listing (standard and compatibility)
//! - [`walker`]: queue-driven traversal applying the [`crate::mask`] rules
//! - [`events`]: optional callback slots
//!
//! # Example
//!
//! ```no_run
//! use dupfind::mask::MaskEngine;
//! use dupfind::scanner::{validate_roots, ScanEvents, Walker};
//! use std::path::PathBuf;
//!
//! let mut events = ScanEvents::new()
//!     .on_file_accepted(|path, size| println!("{}: {} bytes", path.display(), size));
//!
//! let roots = validate_roots(&[PathBuf::from(".")], &mut events).unwrap();
//! let mut walker = Walker::new(MaskEngine::new());
//! walker.walk_all(&roots, &mut events);
//! ```

pub mod events;
pub mod lister;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use events::ScanEvents;
pub use lister::{DirectoryLister, ListedEntry, ListerKind, Listing, ReadDirLister, WalkdirLister};
pub use walker::{WalkStats, Walker};

/// An object found while walking, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemObject {
    /// Full path of the object
    pub path: PathBuf,
    /// Whether the object is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl FilesystemObject {
    /// Describe a regular file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size,
        }
    }

    /// Describe a directory.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: 0,
        }
    }

    /// Base name of the object, or the whole path when it has none.
    #[must_use]
    pub fn name(&self) -> std::borrow::Cow<'_, str> {
        self.path
            .file_name()
            .map_or_else(|| self.path.to_string_lossy(), |n| n.to_string_lossy())
    }
}

impl From<ListedEntry> for FilesystemObject {
    fn from(entry: ListedEntry) -> Self {
        Self {
            path: entry.path,
            is_dir: entry.is_dir,
            size: if entry.is_dir { 0 } else { entry.size },
        }
    }
}

/// What a scan root refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A directory that is walked.
    Directory,
    /// A file that is reported as found without any filtering.
    File,
}

/// A validated, absolute scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    path: PathBuf,
    kind: RootKind,
}

impl ScanRoot {
    /// Validate a user supplied root.
    ///
    /// Relative paths are made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// - [`ScanError::InvalidPath`] if the path is empty or cannot be resolved
    /// - [`ScanError::PathNotFound`] if nothing exists at the path
    pub fn validate(raw: &Path) -> Result<Self, ScanError> {
        if raw.as_os_str().is_empty() {
            return Err(ScanError::InvalidPath {
                path: raw.to_path_buf(),
                reason: "path is empty".to_string(),
            });
        }

        let path = std::path::absolute(raw).map_err(|e| ScanError::InvalidPath {
            path: raw.to_path_buf(),
            reason: e.to_string(),
        })?;

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::PathNotFound(path));
            }
            Err(e) => {
                return Err(ScanError::InvalidPath {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let kind = if metadata.is_dir() {
            RootKind::Directory
        } else {
            RootKind::File
        };

        Ok(Self { path, kind })
    }

    /// Absolute path of the root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the root is walked or reported directly.
    #[must_use]
    pub fn kind(&self) -> RootKind {
        self.kind
    }
}

/// Validate every root, reporting each failure through `events`.
///
/// All roots are checked so that every bad root is reported once; the run is
/// then refused if any of them failed.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_roots(
    raw_roots: &[PathBuf],
    events: &mut ScanEvents<'_>,
) -> Result<Vec<ScanRoot>, ScanError> {
    let mut roots = Vec::with_capacity(raw_roots.len());
    let mut first_error = None;

    for raw in raw_roots {
        match ScanRoot::validate(raw) {
            Ok(root) => {
                log::debug!("Scan root: {} ({:?})", root.path().display(), root.kind());
                roots.push(root);
            }
            Err(e) => {
                log::debug!("Invalid scan root {}: {}", raw.display(), e);
                events.path_validation_failed(&raw.to_string_lossy(), &e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(roots),
    }
}

/// Errors that can occur during scanning.
///
/// Clonable so that walk errors can be both reported and collected.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScanError {
    /// A scan root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A scan root is not a usable path.
    #[error("Path is invalid: {path}: {reason}")]
    InvalidPath {
        /// The offending path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// A directory or entry could not be listed during the walk.
    #[error("I/O error for {path}: {source}")]
    ScanIo {
        /// Directory or entry where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl ScanError {
    /// Whether this error concerns root validation rather than the walk.
    #[must_use]
    pub fn is_path_validation(&self) -> bool {
        matches!(self, Self::PathNotFound(_) | Self::InvalidPath { .. })
    }
}
