//! JSON output formatter for compare results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "size": 1024,
//!       "hash": "A9993E36...",
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "failed": [
//!     { "path": "/path/to/locked.bin", "error": "Permission denied: ...", "os_code": 13 }
//!   ],
//!   "summary": {
//!     "found": 100,
//!     "ready_to_compare": 40,
//!     "ignored": 3,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "reclaimable_space": 51200,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "DF000"
//!   }
//! }
//! ```
//!
//! `hash` is `null` unless group hashing was requested.

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, DuplicateReport, ScanSummary};
use crate::error::ExitCode;
use crate::file::FileAccessor;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// File size in bytes
    pub size: u64,
    /// Content digest as uppercase hex, when computed
    pub hash: Option<String>,
    /// Absolute paths to all duplicate files
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a DuplicateGroup.
    ///
    /// Paths are converted to absolute paths where possible.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            size: group.size,
            hash: group.hash.as_ref().map(ToString::to_string),
            files: group.paths().map(normalize_path).collect(),
        }
    }
}

/// A file that could not be compared.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// Path of the file
    pub path: String,
    /// Error message
    pub error: String,
    /// Raw OS error code, when there is one
    pub os_code: Option<i32>,
}

impl JsonFailure {
    #[must_use]
    fn from_file(file: &FileAccessor) -> Self {
        let error = file.last_error();
        Self {
            path: file.path().to_string_lossy().into_owned(),
            error: error.map_or_else(|| "unknown error".to_string(), ToString::to_string),
            os_code: error.and_then(|e| e.os_code()),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
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
    /// Space taken by the duplicate files (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DF000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            found: summary.found,
            ready_to_compare: summary.ready_to_compare,
            ignored: summary.ignored,
            failed: summary.failed,
            scan_errors: summary.scan_errors,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Files that could not be compared
    pub failed: Vec<JsonFailure>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from a report and the exit code of the run.
    #[must_use]
    pub fn new(report: &DuplicateReport, exit_code: ExitCode) -> Self {
        Self {
            duplicates: report
                .groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            failed: report.failed.iter().map(JsonFailure::from_file).collect(),
            summary: JsonSummary::from_scan_summary(&report.summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Normalize a path to an absolute path string.
///
/// Falls back to the display representation if the path cannot be
/// canonicalized (e.g., the file no longer exists).
fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
