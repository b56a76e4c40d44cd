//! dupfind - Byte-exact duplicate file comparer and file finder
//!
//! A cross-platform Rust CLI application that walks directory trees with
//! include/exclude masks, then either partitions same-size files into groups
//! of identical content or reports files matching content and digest criteria.
//!
//! # Modules
//!
//! - [`mask`]: wildcard rules deciding what is scanned, searched in and reported
//! - [`scanner`]: root validation and the queue-driven directory walker
//! - [`file`]: buffered or memory-mapped file access, hashing and filtering
//! - [`duplicates`]: size bucketing and partitioning into identical groups
//! - [`search`]: concurrent content and digest filtering of walked files
//! - [`output`]: text and JSON rendering

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod file;
pub mod logging;
pub mod mask;
pub mod output;
pub mod scanner;
pub mod search;

use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use cli::{Cli, Commands, CompareArgs, MaskArgs, SearchArgs};
use config::Config;
use duplicates::{DuplicateFinder, FinderConfig};
use error::ExitCode;
use file::{FileAccessor, FilterCriteria, HashAlgorithm};
use mask::{Family, MaskEngine, MaskError, Polarity, SizeRange, Target};
use output::{JsonOutput, OutputFormat, TextOutput};
use scanner::{ListerKind, ScanEvents};
use search::{FileSearch, SearchOptions};

/// Engine settings after merging the config file with command-line flags.
#[derive(Debug, Clone, Copy)]
struct Settings {
    threads: usize,
    hash_algorithm: HashAlgorithm,
    heap_threshold: u64,
    lister: ListerKind,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            threads: cli.threads.unwrap_or(config.threads),
            hash_algorithm: cli.hash_algorithm.unwrap_or(config.hash_algorithm),
            heap_threshold: cli.heap_threshold.unwrap_or(config.heap_threshold),
            lister: if cli.legacy_walker {
                ListerKind::Compatibility
            } else {
                config.lister()
            },
        }
    }
}

/// Which front end a mask configuration is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Duplicate comparison
    Compare,
    /// File search
    Search,
}

/// Build the mask engine for one run.
///
/// File masks and all exclusions are consider rules in both modes. Directory
/// and path inclusions differ:
///
/// - [`RunMode::Compare`]: consider rules. A directory whose name does not
///   match is ignored and not entered; a file whose full path does not match
///   is ignored.
/// - [`RunMode::Search`]: recurse-into rules, which restrict where files are
///   taken from without stopping the walk.
///
/// # Errors
///
/// Returns the first pattern that does not compile, or an inverted size range.
pub fn build_masks(
    mode: RunMode,
    include_files: &[String],
    args: &MaskArgs,
) -> Result<MaskEngine, MaskError> {
    let include_family = match mode {
        RunMode::Compare => Family::Consider,
        RunMode::Search => Family::RecurseInto,
    };

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FileName, Polarity::Include, include_files)?
        .add_rules(Family::Consider, Target::FileName, Polarity::Exclude, &args.exclude_files)?
        .add_rules(Family::Consider, Target::DirName, Polarity::Exclude, &args.exclude_dirs)?
        .add_rules(Family::Consider, Target::FullPath, Polarity::Exclude, &args.exclude_paths)?
        .add_rules(include_family, Target::DirName, Polarity::Include, &args.include_dirs)?
        .add_rules(include_family, Target::FullPath, Polarity::Include, &args.include_paths)?;
    masks.set_size_range(SizeRange::new(args.min_size, args.max_size)?);
    Ok(masks)
}

/// Run the application for parsed command-line arguments.
///
/// Results go to stdout, diagnostics to stderr.
///
/// # Errors
///
/// Returns an error if the arguments are unusable (bad mask, bad digest,
/// invalid root) or if the results cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let settings = Settings::resolve(&cli, &config);
    let text = TextOutput::new(!cli.no_color && io::stdout().is_terminal());
    log::debug!("Settings: {:?}", settings);

    match &cli.command {
        Commands::Compare(args) => run_compare(args, settings, text),
        Commands::Search(args) => run_search(args, settings, text),
    }
}

fn report_invalid_root(root: &str, error: &scanner::ScanError) {
    eprintln!("Invalid path '{}': {}", root, error);
}

fn run_compare(args: &CompareArgs, settings: Settings, text: TextOutput) -> Result<ExitCode> {
    let masks =
        build_masks(RunMode::Compare, &args.include_files, &args.masks).context("Invalid mask")?;
    let config = FinderConfig::default()
        .with_io_threads(settings.threads)
        .with_heap_threshold(settings.heap_threshold)
        .with_lister(settings.lister)
        .with_group_hash(args.hash.then_some(settings.hash_algorithm));
    let finder = DuplicateFinder::new(config, masks);

    let mut events = ScanEvents::new().on_path_validation_failed(report_invalid_root);
    let report = finder
        .find_duplicates(&args.paths, &mut events)
        .context("Cannot compare files")?;

    let exit_code = ExitCode::for_outcome(!report.groups.is_empty(), report.summary.has_failures());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => text
            .write_report(&mut out, &report, args.show_ignored)
            .context("Cannot write report")?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code)
            .write_to(&mut out, true)
            .context("Cannot write report")?,
    }
    out.flush().context("Cannot write report")?;

    Ok(exit_code)
}

/// Translate search arguments into engine options.
///
/// A digest allow list turns on digest printing.
fn search_options(args: &SearchArgs, settings: Settings) -> Result<SearchOptions> {
    let mut criteria = FilterCriteria::new()
        .with_hashes(&args.hashes)
        .context("Invalid digest")?;
    if let Some(content) = &args.content {
        criteria = criteria
            .with_content(content.as_bytes())
            .context("Invalid content filter")?;
    }

    Ok(SearchOptions::default()
        .with_criteria(criteria)
        .with_print_hash(args.print_hash || !args.hashes.is_empty())
        .with_group_by(args.group_by)
        .with_directories_only(args.dirs)
        .with_hash_algorithm(settings.hash_algorithm)
        .with_heap_threshold(settings.heap_threshold)
        .with_threads(settings.threads)
        .with_lister(settings.lister))
}

fn run_search(args: &SearchArgs, settings: Settings, text: TextOutput) -> Result<ExitCode> {
    let masks =
        build_masks(RunMode::Search, &args.file_masks, &args.masks).context("Invalid mask")?;
    let options = search_options(args, settings)?;
    let print_hash = options.print_hash;
    let search = FileSearch::new(options, masks);

    let print_size = args.print_size;
    let stdout = Mutex::new(io::stdout());
    let print_match = |file: &FileAccessor| {
        let mut out = stdout.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", text.search_line(file, print_hash, print_size)) {
            log::debug!("Cannot write result: {}", e);
        }
    };

    let mut events = ScanEvents::new().on_path_validation_failed(report_invalid_root);
    let outcome = search
        .run(&args.paths, &mut events, &print_match)
        .context("Cannot search files")?;

    for file in &outcome.unreadable {
        if let Some(error) = file.last_error() {
            log::warn!("{}", error);
        }
    }

    let mut out = stdout.lock().unwrap_or_else(PoisonError::into_inner);
    if args.dirs {
        for dir in &outcome.directories {
            writeln!(out, "{}", text.directory_line(dir)).context("Cannot write results")?;
        }
    } else if let Some(by) = args.group_by {
        write!(out, "{}", text.render_groups(&outcome.grouped(by), print_hash, print_size))
            .context("Cannot write results")?;
    }
    let found = outcome.found_count(args.dirs);
    writeln!(out, "{}", text.found_line(found)).context("Cannot write results")?;

    Ok(ExitCode::for_outcome(found > 0, outcome.has_failures()))
}
