//! vidupe - Duplicate Video Finder
//!
//! Finds videos whose raw video stream is contained in (or mostly contained
//! in) another video's stream. Each container's first track is demuxed with
//! `mkvextract`, a fixed number of header and footer bytes is trimmed, and
//! the trimmed streams of a folder are compared largest-first with an early
//! exit per candidate.
//!
//! The building blocks are usable on their own:
//!
//! - [`streams`]: threshold, subsequence matcher, normalizer
//! - [`duplicates`]: the size-ordered comparison engine
//! - [`pipeline`]: traversal, demuxing and per-folder workspaces
//! - [`output`]: text, JSON and CSV reports

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod signal;
pub mod streams;

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, CompareArgs, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::MatchPair;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::pipeline::{MkvExtract, Pipeline};
use crate::progress::Progress;
use crate::streams::{compare_files, Stream, Threshold};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, a missing demuxer, an
/// unusable base folder, or a failure writing the report. Problems confined
/// to single folders or streams are reported and reflected in the exit code
/// instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let color = !cli.no_color && std::io::stdout().is_terminal();
    if !color {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(ref args) => handle_scan(&cli, args, color),
        Commands::Compare(ref args) => handle_compare(&cli, args),
    }
}

fn handle_scan(cli: &Cli, args: &ScanArgs, color: bool) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.merge_scan_args(args);
    let pipeline_config = config.pipeline_config()?;
    log::debug!("Effective configuration: {:?}", config);

    // The demuxer must exist before any folder is touched.
    let demuxer = MkvExtract::locate(config.mkvextract.as_deref())?;
    log::info!("Using {}", demuxer.program().display());

    let handler = signal::install_handler()?;
    let progress = Arc::new(Progress::new(cli.quiet || config.output != OutputFormat::Text));

    let pipeline = Pipeline::new(
        pipeline_config
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(progress),
        Arc::new(demuxer),
    );
    let report = pipeline.run(&args.path, args.mode)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(&report, color)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&report)
            .write_to(&mut out, true)
            .context("Failed to write JSON report")?,
        OutputFormat::Csv => CsvOutput::new(&report)
            .write_to(&mut out)
            .context("Failed to write CSV report")?,
    }
    out.flush()?;

    Ok(report.exit_code())
}

fn handle_compare(cli: &Cli, args: &CompareArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    let threshold: Threshold = config.threshold()?;

    let small = Stream::from_path(&args.small)?;
    let large = Stream::from_path(&args.large)?;
    let found = compare_files(&small.path, &large.path, threshold)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match found {
        Some(kind) => {
            writeln!(out, "{}", MatchPair::new(&small, &large, kind, threshold).describe())?;
            Ok(ExitCode::Success)
        }
        None => {
            writeln!(
                out,
                "{} does not match {} at {}%",
                small.label, large.label, threshold
            )?;
            Ok(ExitCode::NoMatches)
        }
    }
}
