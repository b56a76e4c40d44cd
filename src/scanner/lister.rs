//! One-level directory listing.
//!
//! # Overview
//!
//! The walker never recurses by itself; it asks a [`DirectoryLister`] for the
//! immediate children of each queued directory. Two listers exist:
//!
//! - [`ReadDirLister`]: the default, built on [`std::fs::read_dir`]
//! - [`WalkdirLister`]: a compatibility lister built on [`walkdir`] and
//!   limited to depth 1, for platforms where `read_dir` misbehaves
//!
//! The lister is chosen once at startup through [`ListerKind`].
//!
//! Only regular files and directories are listed. Symbolic links to files are
//! listed with the target's size; symbolic links to directories are skipped
//! so that link cycles cannot trap the walk. Other special files (sockets,
//! FIFOs, devices) are skipped.

use std::fs::{self, FileType};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// An immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

/// Result of listing one directory.
///
/// The outer error means the directory itself could not be opened; inner
/// errors concern single entries and do not invalidate their siblings.
pub type Listing = io::Result<Vec<io::Result<ListedEntry>>>;

/// Lists the immediate children of a directory.
pub trait DirectoryLister: Send + Sync {
    /// List `dir` one level deep.
    fn list(&self, dir: &Path) -> Listing;

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

/// Which lister implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListerKind {
    /// [`ReadDirLister`]
    #[default]
    Standard,
    /// [`WalkdirLister`]
    Compatibility,
}

impl ListerKind {
    /// Build the lister.
    #[must_use]
    pub fn build(self) -> Box<dyn DirectoryLister> {
        match self {
            Self::Standard => Box::new(ReadDirLister),
            Self::Compatibility => Box::new(WalkdirLister),
        }
    }
}

/// Default lister using [`std::fs::read_dir`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadDirLister;

impl DirectoryLister for ReadDirLister {
    fn list(&self, dir: &Path) -> Listing {
        let entries = fs::read_dir(dir)?
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(e)),
                };
                let file_type = match entry.file_type() {
                    Ok(t) => t,
                    Err(e) => return Some(Err(e)),
                };
                classify(entry.path(), file_type, || entry.metadata()).transpose()
            })
            .collect();
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "read_dir"
    }
}

/// Compatibility lister using [`walkdir`] at depth 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkdirLister;

impl DirectoryLister for WalkdirLister {
    fn list(&self, dir: &Path) -> Listing {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                // A depth-0 error means the directory itself could not be read
                Err(e) if e.depth() == 0 => return Err(walkdir_to_io(e)),
                Err(e) => {
                    entries.push(Err(walkdir_to_io(e)));
                    continue;
                }
            };

            if is_pseudo_entry(entry.file_name()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            if let Some(listed) =
                classify(path, entry.file_type(), || entry.metadata().map_err(walkdir_to_io))
                    .transpose()
            {
                entries.push(listed);
            }
        }

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "walkdir"
    }
}

/// The self and parent entries some enumeration APIs return.
fn is_pseudo_entry(name: &std::ffi::OsStr) -> bool {
    name == "." || name == ".."
}

fn walkdir_to_io(error: walkdir::Error) -> io::Error {
    let message = error.to_string();
    error
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message))
}

/// Turn a raw entry into a [`ListedEntry`], or `None` if it is skipped.
fn classify(
    path: PathBuf,
    file_type: FileType,
    metadata: impl FnOnce() -> io::Result<fs::Metadata>,
) -> io::Result<Option<ListedEntry>> {
    if file_type.is_dir() {
        return Ok(Some(ListedEntry {
            path,
            is_dir: true,
            size: 0,
        }));
    }

    if file_type.is_symlink() {
        let target = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Skipping dangling symlink {}: {}", path.display(), e);
                return Ok(None);
            }
        };
        if target.is_file() {
            return Ok(Some(ListedEntry {
                path,
                is_dir: false,
                size: target.len(),
            }));
        }
        log::trace!("Skipping symlink to non-file: {}", path.display());
        return Ok(None);
    }

    if file_type.is_file() {
        let size = metadata()?.len();
        return Ok(Some(ListedEntry {
            path,
            is_dir: false,
            size,
        }));
    }

    log::trace!("Skipping special file: {}", path.display());
    Ok(None)
}
