//! Output formatters for compare and search results.
//!
//! # Overview
//!
//! - [`TextOutput`]: human-readable listings, optionally coloured with `yansi`
//! - [`json::JsonOutput`]: machine-readable duplicate report
//!
//! Rendering functions return plain `String`s so they can be tested without a
//! terminal; the `write_*` helpers push them to any writer.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{DuplicateFinder, FinderConfig};
//! use dupfind::mask::MaskEngine;
//! use dupfind::output::TextOutput;
//! use dupfind::scanner::ScanEvents;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default(), MaskEngine::new());
//! let report = finder
//!     .find_duplicates(&[PathBuf::from(".")], &mut ScanEvents::new())
//!     .unwrap();
//!
//! let text = TextOutput::new(false);
//! print!("{}", text.render_report(&report, false));
//! ```

pub mod json;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use yansi::{Paint, Style};

use crate::duplicates::{DuplicateGroup, DuplicateReport, ScanSummary};
use crate::file::FileAccessor;
use crate::search::GroupKey;

pub use json::{JsonOutput, JsonOutputError};

/// Output format for compare results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// JSON document
    Json,
}

const HEADING: Style = Style::new().bold().cyan();
const NOTICE: Style = Style::new().yellow();
const FAILURE: Style = Style::new().red();
const DIM: Style = Style::new().dim();

/// Human-readable renderer.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput {
    colored: bool,
}

impl TextOutput {
    /// Create a renderer. Colours are only emitted when `colored` is true.
    #[must_use]
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint(&self, text: impl AsRef<str>, style: Style) -> String {
        let text = text.as_ref();
        if self.colored {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// The scan counters line printed before the groups.
    #[must_use]
    pub fn summary_line(&self, summary: &ScanSummary) -> String {
        format!(
            "{} files found. {} of them ready to compare. {} objects ignored.",
            summary.found, summary.ready_to_compare, summary.ignored
        )
    }

    /// Heading of the `number`-th group (1-based).
    #[must_use]
    pub fn group_heading(&self, number: usize, group: &DuplicateGroup) -> String {
        let mut heading = format!(
            "Group of equal files #{}, file size {}",
            number,
            bytesize::ByteSize::b(group.size)
        );
        if let Some(hash) = &group.hash {
            heading.push_str(&format!(". Files hash: {}", hash));
        }
        self.paint(heading, HEADING)
    }

    /// One failed file with its captured error.
    #[must_use]
    pub fn failure_line(&self, file: &FileAccessor) -> String {
        let line = match file.last_error() {
            Some(error) => match error.os_code() {
                Some(code) => format!("{} (error code {})", error, code),
                None => error.to_string(),
            },
            None => format!("{}: unknown error", file.path().display()),
        };
        self.paint(line, FAILURE)
    }

    /// Render a whole compare report.
    ///
    /// With `show_ignored`, every object rejected by the masks is listed
    /// first.
    #[must_use]
    pub fn render_report(&self, report: &DuplicateReport, show_ignored: bool) -> String {
        let mut out = String::new();

        if show_ignored {
            for path in &report.ignored {
                out.push_str(&self.paint(format!("Object '{}' ignored", path.display()), DIM));
                out.push('\n');
            }
        }

        out.push_str(&self.summary_line(&report.summary));
        out.push('\n');

        if report.groups.is_empty() {
            out.push_str(&self.paint("No equal files found", NOTICE));
            out.push('\n');
        } else {
            for (index, group) in report.groups.iter().enumerate() {
                out.push_str(&self.group_heading(index + 1, group));
                out.push('\n');
                for path in group.paths() {
                    out.push_str(&path.display().to_string());
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(&format!(
                "{} duplicate files in {} groups, {} reclaimable\n",
                report.summary.duplicate_files,
                report.summary.duplicate_groups,
                report.summary.reclaimable_display()
            ));
        }

        if !report.scan_errors.is_empty() {
            out.push('\n');
            out.push_str(&self.paint(
                format!("{} directories could not be scanned:", report.scan_errors.len()),
                NOTICE,
            ));
            out.push('\n');
            for error in &report.scan_errors {
                out.push_str(&self.paint(error.to_string(), FAILURE));
                out.push('\n');
            }
        }

        if !report.failed.is_empty() {
            out.push('\n');
            out.push_str(&self.paint(
                format!("{} files could not be compared:", report.failed.len()),
                NOTICE,
            ));
            out.push('\n');
            for file in &report.failed {
                out.push_str(&self.failure_line(file));
                out.push('\n');
            }
        }

        out
    }

    /// Write a compare report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_report<W: Write>(
        &self,
        writer: &mut W,
        report: &DuplicateReport,
        show_ignored: bool,
    ) -> io::Result<()> {
        writer.write_all(self.render_report(report, show_ignored).as_bytes())
    }

    /// One search result: the path, then the digest and size when asked for.
    #[must_use]
    pub fn search_line(&self, file: &FileAccessor, print_hash: bool, print_size: bool) -> String {
        let mut line = file.path().display().to_string();
        if print_hash {
            line.push(' ');
            match file.hash() {
                Some(hash) => line.push_str(&hash.to_string()),
                None => line.push_str(&self.paint("hash failed", FAILURE)),
            }
        }
        if print_size {
            line.push(' ');
            line.push_str(&bytesize::ByteSize::b(file.size()).to_string());
        }
        line
    }

    /// One directory search result.
    #[must_use]
    pub fn directory_line(&self, path: &Path) -> String {
        path.display().to_string()
    }

    /// Grouped search results: a `[key]` heading per group, members below.
    #[must_use]
    pub fn render_groups(
        &self,
        groups: &BTreeMap<GroupKey, Vec<&FileAccessor>>,
        print_hash: bool,
        print_size: bool,
    ) -> String {
        let mut out = String::new();
        for (key, files) in groups {
            out.push_str(&self.paint(format!("[{}]", key), HEADING));
            out.push('\n');
            for file in files {
                out.push_str(&self.search_line(file, print_hash, print_size));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Closing line of a search.
    #[must_use]
    pub fn found_line(&self, count: usize) -> String {
        format!("{} files found", count)
    }
}
