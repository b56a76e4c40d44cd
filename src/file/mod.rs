//! Uniform byte access to file content.
//!
//! # Overview
//!
//! A [`FileAccessor`] owns at most one storage representation of a file's
//! content while it is open:
//!
//! - files up to the heap threshold (1 MiB by default) are read into an owned
//!   buffer
//! - larger files are memory-mapped read-only
//!
//! On top of that it provides digest computation (cached after the first
//! success), byte-wise comparison against another accessor and content/hash
//! filtering. Every operation that opens the file closes it again before
//! returning, so thousands of accessors can exist without holding handles.
//!
//! Failures never propagate past the accessor as panics: the last open error
//! is kept on the accessor and is available through
//! [`FileAccessor::last_error`].
//!
//! # Example
//!
//! ```no_run
//! use dupfind::file::{FileAccessor, HashAlgorithm};
//!
//! let mut a = FileAccessor::new("a.bin", 1024);
//! let mut b = FileAccessor::new("b.bin", 1024);
//!
//! if a.compare_to(&mut b) {
//!     println!("identical");
//! }
//! let digest = a.compute_hash(&HashAlgorithm::Sha1).unwrap();
//! println!("{}", digest);
//! ```

pub mod filter;
pub mod hasher;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

pub use filter::{ContentNeedle, FilterCriteria, FilterError};
pub use hasher::{ContentHasher, Digest, DigestParseError, HashAlgorithm};

/// Default size boundary between buffered and mapped access.
pub const HEAP_THRESHOLD: u64 = 1024 * 1024;

/// Errors from opening or reading a single file.
///
/// Clonable so that it can be cached on the accessor and carried in failure
/// lists.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FileError {
    /// The file no longer exists.
    #[error("File not found: {path}")]
    NotFound {
        /// The file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Arc<io::Error>,
    },

    /// The file cannot be read with the current permissions.
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// The file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Arc<io::Error>,
    },

    /// The content buffer could not be allocated.
    #[error("Not enough memory to read {path} ({size} bytes)")]
    OutOfMemory {
        /// The file
        path: PathBuf,
        /// Requested buffer size
        size: u64,
    },

    /// The accessor has no content to work on.
    #[error("No content available for {0}")]
    NoContent(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// The file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Arc<io::Error>,
    },
}

impl FileError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        let path = path.to_path_buf();
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path,
                source: Arc::new(error),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path,
                source: Arc::new(error),
            },
            _ => Self::Io {
                path,
                source: Arc::new(error),
            },
        }
    }

    /// The file this error concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::OutOfMemory { path, .. }
            | Self::Io { path, .. } => path,
            Self::NoContent(path) => path,
        }
    }

    /// The raw OS error code, when the failure came from the OS.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::NotFound { source, .. }
            | Self::PermissionDenied { source, .. }
            | Self::Io { source, .. } => source.raw_os_error(),
            Self::OutOfMemory { .. } | Self::NoContent(_) => None,
        }
    }
}

enum Storage {
    Buffered(Vec<u8>),
    Mapped(Mmap),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Buffered(buffer) => buffer,
            Self::Mapped(view) => view,
        }
    }
}

/// A file whose content can be opened, hashed, compared and searched.
pub struct FileAccessor {
    path: PathBuf,
    size: u64,
    heap_threshold: u64,
    storage: Option<Storage>,
    hash: Option<Digest>,
    last_error: Option<FileError>,
    filter_result: Option<bool>,
}

impl std::fmt::Debug for FileAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = match &self.storage {
            None => "closed",
            Some(Storage::Buffered(_)) => "buffered",
            Some(Storage::Mapped(_)) => "mapped",
        };
        f.debug_struct("FileAccessor")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("storage", &storage)
            .field("hash", &self.hash)
            .field("last_error", &self.last_error)
            .field("filter_result", &self.filter_result)
            .finish()
    }
}

impl FileAccessor {
    /// Create a closed accessor with a size known from the walk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            heap_threshold: HEAP_THRESHOLD,
            storage: None,
            hash: None,
            last_error: None,
            filter_result: None,
        }
    }

    /// Set the size boundary between buffered and mapped access.
    #[must_use]
    pub fn with_heap_threshold(mut self, threshold: u64) -> Self {
        self.heap_threshold = threshold;
        self
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file size in bytes.
    ///
    /// Known from the walk and refreshed on every successful open.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The cached digest, if one was computed.
    #[must_use]
    pub fn hash(&self) -> Option<&Digest> {
        self.hash.as_ref()
    }

    /// The error from the most recent failed operation, cleared by a
    /// successful open.
    #[must_use]
    pub fn last_error(&self) -> Option<&FileError> {
        self.last_error.as_ref()
    }

    /// The cached filter outcome: `None` until [`Self::matches_filter`] ran.
    #[must_use]
    pub fn filter_result(&self) -> Option<bool> {
        self.filter_result
    }

    /// Whether content is currently held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.storage.is_some()
    }

    /// Whether the content is currently memory-mapped.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Some(Storage::Mapped(_)))
    }

    /// Open the file and load or map its content.
    ///
    /// Any previously held content is released first.
    ///
    /// # Errors
    ///
    /// Returns the [`FileError`] that is also stored as [`Self::last_error`].
    pub fn open(&mut self) -> Result<(), FileError> {
        self.close();

        match self.load() {
            Ok(storage) => {
                self.storage = Some(storage);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                log::debug!("Cannot open {}: {}", self.path.display(), e);
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn load(&mut self) -> Result<Storage, FileError> {
        let file = File::open(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        let size = file
            .metadata()
            .map_err(|e| FileError::from_io(&self.path, e))?
            .len();
        self.size = size;

        if size <= self.heap_threshold {
            let out_of_memory = || FileError::OutOfMemory {
                path: self.path.clone(),
                size,
            };
            let capacity = usize::try_from(size).map_err(|_| out_of_memory())?;
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(capacity)
                .map_err(|_| out_of_memory())?;
            file.take(size)
                .read_to_end(&mut buffer)
                .map_err(|e| FileError::from_io(&self.path, e))?;
            return Ok(Storage::Buffered(buffer));
        }

        // SAFETY: the view is read-only and dropped on close. Concurrent
        // truncation by another process is outside our control, as with any
        // memory-mapped file.
        let view = unsafe { Mmap::map(&file) }.map_err(|e| FileError::from_io(&self.path, e))?;
        Ok(Storage::Mapped(view))
    }

    /// Release the content. Safe to call any number of times.
    pub fn close(&mut self) {
        self.storage = None;
    }

    /// The content of an open file, or `None` when closed.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.storage.as_ref().map(Storage::bytes)
    }

    /// Compute the content digest, or return the cached one.
    ///
    /// The file is closed again before returning.
    ///
    /// # Errors
    ///
    /// Returns the open failure, which is also kept as [`Self::last_error`].
    pub fn compute_hash(&mut self, hasher: &dyn ContentHasher) -> Result<Digest, FileError> {
        if let Some(hash) = &self.hash {
            return Ok(hash.clone());
        }

        self.open()?;
        let digest = match self.content() {
            Some(content) => hasher.digest(content),
            None => {
                let e = FileError::NoContent(self.path.clone());
                self.last_error = Some(e.clone());
                return Err(e);
            }
        };
        self.close();

        self.hash = Some(digest.clone());
        Ok(digest)
    }

    /// Compare the content of two files byte by byte.
    ///
    /// Returns `false` without opening anything when sizes differ. Both files
    /// are opened independently, so each side's [`Self::last_error`] reflects
    /// its own outcome. Both are closed before returning.
    pub fn compare_to(&mut self, other: &mut FileAccessor) -> bool {
        if self.size != other.size {
            return false;
        }

        let mine = self.open();
        let theirs = other.open();

        let equal = match (mine, theirs, self.content(), other.content()) {
            (Ok(()), Ok(()), Some(a), Some(b)) => a.len() == b.len() && a == b,
            _ => false,
        };

        self.close();
        other.close();
        equal
    }

    /// Whether the file passes the content and hash criteria.
    ///
    /// The content check runs first; the hash check runs only when the
    /// content check passed or was not requested. The outcome is cached as
    /// [`Self::filter_result`].
    pub fn matches_filter(&mut self, criteria: &FilterCriteria, hasher: &dyn ContentHasher) -> bool {
        let mut result = true;

        if let Some(needle) = criteria.content() {
            if self.open().is_err() {
                self.filter_result = Some(false);
                return false;
            }
            result = self.content().is_some_and(|content| needle.is_found_in(content));
            self.close();
        }

        if result && !criteria.hashes().is_empty() {
            result = match self.compute_hash(hasher) {
                Ok(digest) => criteria.allows(&digest),
                Err(_) => false,
            };
        }

        self.filter_result = Some(result);
        result
    }
}
