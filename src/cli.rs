//! Command-line interface definitions for vidupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Compare every movie folder separately
//! vidupe scan /media/Movies --mode check-movie-folder
//!
//! # Check extras folders with a lower threshold and JSON output
//! vidupe scan /media/Movies --mode check-extras-folder --threshold 90 --output json
//!
//! # Compare two raw streams directly
//! vidupe compare trailer.h264 movie.h264
//!
//! # Verbose mode for debugging
//! vidupe -v scan /media/Movies --mode check-folder
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::ScanMode;
use crate::streams::{ShortStreamPolicy, Threshold};

/// Duplicate video finder based on raw stream containment.
///
/// vidupe extracts the video track of every container, trims the volatile
/// header and footer bytes, and reports every video whose stream is
/// contained in (or mostly contained in) a larger one.
#[derive(Debug, Parser)]
#[command(name = "vidupe")]
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

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML); defaults to the platform config directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for vidupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a video library for duplicates
    Scan(ScanArgs),
    /// Check whether one raw stream file is contained in another
    Compare(CompareArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Base folder of the library
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// How the base folder is split into comparison sets
    ///
    /// check-folder: everything under PATH, recursively, as one set.
    /// check-movie-folder: each subfolder of PATH, recursively.
    /// check-extras-folder: each subfolder of each subfolder of PATH, non-recursive.
    #[arg(short, long, value_enum)]
    pub mode: ScanMode,

    /// Percentage of a stream that must be found for a partial match [default: 95]
    #[arg(short, long, value_name = "PERCENT", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Bytes trimmed from the start of each stream (e.g., 1MiB) [default: 1MiB]
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub header_bytes: Option<u64>,

    /// Bytes trimmed from the end of each stream (e.g., 1MiB) [default: 1MiB]
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub footer_bytes: Option<u64>,

    /// Container extension to scan (can be specified multiple times) [default: mkv]
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Path to the mkvextract executable
    ///
    /// When set, no other location is searched.
    #[arg(long, value_name = "PATH")]
    pub mkvextract: Option<PathBuf>,

    /// Directory in which per-folder workspaces are created
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Worker threads for the comparison sweep [default: 1]
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Fail a folder on the first unreadable stream instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// What to do with streams too short to trim [default: skip]
    #[arg(long, value_enum, value_name = "POLICY")]
    pub short_streams: Option<ShortStreamPolicy>,

    /// Output format [default: text]
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Stream expected to be the smaller one
    #[arg(value_name = "SMALL")]
    pub small: PathBuf,

    /// Stream expected to contain it
    #[arg(value_name = "LARGE")]
    pub large: PathBuf,

    /// Percentage of SMALL that must be found for a partial match [default: 95]
    #[arg(short, long, value_name = "PERCENT", value_parser = parse_threshold)]
    pub threshold: Option<f64>,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse and validate a match threshold percentage.
///
/// # Examples
///
/// ```
/// use vidupe::cli::parse_threshold;
///
/// assert_eq!(parse_threshold("95").unwrap(), 95.0);
/// assert!(parse_threshold("101").is_err());
/// assert!(parse_threshold("abc").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the value is not a number or is outside `[0, 100]`.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let value: f64 = s
        .parse()
        .map_err(|_| format!("{s} is not a valid float."))?;
    Threshold::new(value)
        .map(Threshold::value)
        .map_err(|e| e.to_string())
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use vidupe::cli::parse_size;
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
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

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

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1024B").unwrap(), 1024);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("1KiB").unwrap(), 1_024);
        assert_eq!(parse_size("1kib").unwrap(), 1_024); // Case insensitive
        assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
        assert_eq!(parse_size("1GiB").unwrap(), 1_073_741_824);
    }

    #[test]
    fn test_parse_size_fractional() {
        assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
        assert_eq!(parse_size("0.5MiB").unwrap(), 524_288);
    }

    #[test]
    fn test_parse_size_with_whitespace() {
        assert_eq!(parse_size("  1024  ").unwrap(), 1024);
        assert_eq!(parse_size("1 MB").unwrap(), 1_000_000);
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("1XB").is_err());
        assert!(parse_size("-1MB").is_err());
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0").unwrap(), 0.0);
        assert_eq!(parse_threshold("100").unwrap(), 100.0);
        assert_eq!(parse_threshold(" 57.5 ").unwrap(), 57.5);
        assert_eq!(
            parse_threshold("150").unwrap_err(),
            "150 is out of range. Must be between 0 and 100."
        );
        assert_eq!(parse_threshold("x").unwrap_err(), "x is not a valid float.");
        assert!(parse_threshold("NaN").is_err());
    }

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["vidupe", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_scan_basic() {
        let cli =
            Cli::try_parse_from(["vidupe", "scan", "/movies", "--mode", "check-folder"]).unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.path, PathBuf::from("/movies"));
                assert_eq!(args.mode, ScanMode::CheckFolder);
                assert_eq!(args.threshold, None);
                assert_eq!(args.output, None);
                assert!(!args.strict);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_with_options() {
        let cli = Cli::try_parse_from([
            "vidupe",
            "-v",
            "scan",
            "/movies",
            "--mode",
            "check-extras-folder",
            "--threshold",
            "90",
            "--header-bytes",
            "2MiB",
            "--footer-bytes",
            "512KiB",
            "--ext",
            "mkv",
            "--ext",
            "mk3d",
            "--threads",
            "4",
            "--strict",
            "--short-streams",
            "error",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.mode, ScanMode::CheckExtrasFolder);
                assert_eq!(args.threshold, Some(90.0));
                assert_eq!(args.header_bytes, Some(2 * 1_048_576));
                assert_eq!(args.footer_bytes, Some(512 * 1_024));
                assert_eq!(args.extensions, vec!["mkv", "mk3d"]);
                assert_eq!(args.threads, Some(4));
                assert!(args.strict);
                assert_eq!(args.short_streams, Some(ShortStreamPolicy::Error));
                assert_eq!(args.output, Some(OutputFormat::Json));
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_mode_is_required() {
        let result = Cli::try_parse_from(["vidupe", "scan", "/movies"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_invalid_threshold() {
        let result = Cli::try_parse_from([
            "vidupe",
            "scan",
            "/movies",
            "--mode",
            "check-folder",
            "--threshold",
            "120",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result =
            Cli::try_parse_from(["vidupe", "-v", "-q", "scan", "/m", "--mode", "check-folder"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_compare() {
        let cli = Cli::try_parse_from([
            "vidupe",
            "--json-errors",
            "compare",
            "a.h264",
            "b.h264",
            "-t",
            "80",
        ])
        .unwrap();
        assert!(cli.json_errors);
        match cli.command {
            Commands::Compare(args) => {
                assert_eq!(args.small, PathBuf::from("a.h264"));
                assert_eq!(args.large, PathBuf::from("b.h264"));
                assert_eq!(args.threshold, Some(80.0));
            }
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vidupe",
            "scan",
            "/m",
            "--mode",
            "check-movie-folder",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_cli_invalid_subcommand() {
        let result = Cli::try_parse_from(["vidupe", "invalid", "/path"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }
}
