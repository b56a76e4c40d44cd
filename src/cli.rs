//! Command-line interface definitions for dupfind.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, engine tuning) apply to both subcommands:
//!
//! - `compare`: find groups of byte-identical files
//! - `search`: find files by name, size, content or digest
//!
//! # Example
//!
//! ```bash
//! # Compare everything below two directories
//! dupfind compare ~/Photos /mnt/backup/Photos
//!
//! # Only JPEGs of at least 100 KB, skipping thumbnail directories, with digests
//! dupfind compare ~/Photos --include-files '*.jpg' --exclude-dirs thumbs --min-size 100KB --hash
//!
//! # Search for logs mentioning a panic and group them by extension
//! dupfind search '*.log' '*.txt' -p /var/log --content panic --group-by extension
//!
//! # Verbose mode for debugging
//! dupfind -v compare .
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::file::HashAlgorithm;
use crate::output::OutputFormat;
use crate::search::GroupBy;

/// Byte-exact duplicate file comparer and file finder.
///
/// dupfind walks one or more roots with include/exclude masks, then either
/// partitions same-size files into groups of identical content or reports
/// files matching content and digest criteria.
#[derive(Debug, Parser)]
#[command(name = "dupfind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of I/O threads (0 picks one per CPU)
    #[arg(long, global = true, value_name = "N")]
    pub threads: Option<usize>,

    /// Digest algorithm for printed and filtered hashes
    #[arg(long, global = true, value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Files larger than this are memory-mapped instead of read (e.g., 1MiB)
    #[arg(long, global = true, value_name = "SIZE", value_parser = parse_size)]
    pub heap_threshold: Option<u64>,

    /// List directories with the compatibility walker
    #[arg(long, global = true)]
    pub legacy_walker: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for dupfind.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find groups of files with identical content
    Compare(CompareArgs),
    /// Find files by name, size, content or digest
    Search(SearchArgs),
}

/// Mask and size options shared by both subcommands.
///
/// Masks accept `*` and `?` wildcards and are matched case-insensitively
/// against the whole name or path. Several masks can be given at once,
/// separated by commas, or by repeating the option.
#[derive(Debug, Clone, Default, Args)]
pub struct MaskArgs {
    /// Skip files whose name matches any of these masks
    #[arg(long, value_name = "MASK", value_delimiter = ',')]
    pub exclude_files: Vec<String>,

    /// Skip directories whose name matches any of these masks
    #[arg(long, value_name = "MASK", value_delimiter = ',')]
    pub exclude_dirs: Vec<String>,

    /// Skip files and directories whose full path matches any of these masks
    #[arg(long, value_name = "MASK", value_delimiter = ',')]
    pub exclude_paths: Vec<String>,

    /// Only enter directories whose name matches one of these masks
    ///
    /// In search mode the walk still goes everywhere; only files directly
    /// inside a matching directory are taken.
    #[arg(long, visible_alias = "search-in-dirs", value_name = "MASK", value_delimiter = ',')]
    pub include_dirs: Vec<String>,

    /// Only take files whose full path matches one of these masks
    ///
    /// In search mode the mask is matched against the directory holding the
    /// file instead.
    #[arg(long, visible_alias = "search-in-paths", value_name = "MASK", value_delimiter = ',')]
    pub include_paths: Vec<String>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Files and directories to compare (defaults to the current directory)
    ///
    /// Masks are not applied to files given here directly.
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Only compare files whose name matches one of these masks
    #[arg(long, value_name = "MASK", value_delimiter = ',')]
    pub include_files: Vec<String>,

    /// Mask and size options
    #[command(flatten)]
    pub masks: MaskArgs,

    /// Print the digest of each group of equal files
    #[arg(long)]
    pub hash: bool,

    /// List every object skipped by the masks
    #[arg(long)]
    pub show_ignored: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the search subcommand.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// File name masks to search for (defaults to every file)
    #[arg(value_name = "MASK")]
    pub file_masks: Vec<String>,

    /// Directory to search (can be specified multiple times; defaults to the current directory)
    #[arg(short, long = "path", value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Mask and size options
    #[command(flatten)]
    pub masks: MaskArgs,

    /// Only report files containing this text
    #[arg(short, long, value_name = "TEXT")]
    pub content: Option<String>,

    /// Only report files with one of these digests (hex, case-insensitive)
    ///
    /// The digest of each match is printed.
    #[arg(long = "hash", value_name = "DIGEST", value_delimiter = ',')]
    pub hashes: Vec<String>,

    /// Print the digest of each file
    #[arg(long)]
    pub print_hash: bool,

    /// Print the size of each file
    #[arg(long)]
    pub print_size: bool,

    /// Group results instead of printing them as they are found
    #[arg(short, long, value_enum, value_name = "KEY")]
    pub group_by: Option<GroupBy>,

    /// Report directories instead of files
    #[arg(long, conflicts_with_all = ["content", "hashes", "print_hash", "print_size", "group_by"])]
    pub dirs: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupfind::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    let too_large = || format!("Size too large: '{s}'");

    // Whole numbers stay in integer arithmetic so large byte counts are exact
    if !num_str.contains('.') {
        let num: u64 = num_str
            .parse()
            .map_err(|_| format!("Invalid number: '{num_str}'"))?;
        return num.checked_mul(multiplier).ok_or_else(too_large);
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;
    let bytes = num * multiplier as f64;
    if bytes >= u64::MAX as f64 {
        return Err(too_large());
    }
    Ok(bytes as u64)
}
