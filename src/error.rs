//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for dupfind.
///
/// - 0: Success (completed normally, something was found)
/// - 1: General error (invalid arguments, unusable root, unexpected failure)
/// - 2: Nothing found (no equal files, or no file matched the search)
/// - 3: Partial success (completed, but some files or directories could not be read)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed and produced results.
    Success = 0,
    /// General error: the run could not be carried out.
    GeneralError = 1,
    /// Nothing found: the run completed without results.
    NothingFound = 2,
    /// Partial success: the run completed with some unreadable objects.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DF000",
            Self::GeneralError => "DF001",
            Self::NothingFound => "DF002",
            Self::PartialSuccess => "DF003",
        }
    }

    /// Pick the code for a completed run.
    ///
    /// Failures win over an empty result so that unreadable files are never
    /// mistaken for "no duplicates".
    #[must_use]
    pub fn for_outcome(found_anything: bool, has_failures: bool) -> Self {
        if has_failures {
            Self::PartialSuccess
        } else if found_anything {
            Self::Success
        } else {
            Self::NothingFound
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
