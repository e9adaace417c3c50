//! Integration tests for error handling at the application boundary:
//! fatal configuration problems, exit codes and structured errors.

use clap::Parser;
use std::fs;
use tempfile::tempdir;
use vidupe::cli::Cli;
use vidupe::error::{ExitCode, StructuredError};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn test_missing_demuxer_is_fatal() {
    let dir = tempdir().unwrap();
    let missing_tool = dir.path().join("no-such-mkvextract");
    let cli = parse(&[
        "vidupe",
        "-q",
        "scan",
        dir.path().to_str().unwrap(),
        "--mode",
        "check-folder",
        "--mkvextract",
        missing_tool.to_str().unwrap(),
        "--output",
        "json",
    ]);

    let err = vidupe::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(err.to_string().contains("mkvextract"));
}

#[test]
fn test_invalid_config_file_is_fatal() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "threshold = \"high\"").unwrap();

    let cli = parse(&[
        "vidupe",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        dir.path().to_str().unwrap(),
        "--mode",
        "check-folder",
    ]);
    assert!(vidupe::run_app(cli).is_err());
}

#[test]
fn test_compare_match_and_no_match() {
    let dir = tempdir().unwrap();
    let large = dir.path().join("Movie.h264");
    let small = dir.path().join("Trailer.h264");
    let other = dir.path().join("Other.h264");
    fs::write(&large, b"0123456789abcdefghij").unwrap();
    fs::write(&small, b"56789abc").unwrap();
    fs::write(&other, b"zyxwvuts").unwrap();

    let cli = parse(&[
        "vidupe",
        "-q",
        "compare",
        small.to_str().unwrap(),
        large.to_str().unwrap(),
    ]);
    assert_eq!(vidupe::run_app(cli).unwrap(), ExitCode::Success);

    let cli = parse(&[
        "vidupe",
        "-q",
        "compare",
        other.to_str().unwrap(),
        large.to_str().unwrap(),
    ]);
    assert_eq!(vidupe::run_app(cli).unwrap(), ExitCode::NoMatches);
}

#[test]
fn test_compare_missing_file() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("a.h264");
    fs::write(&present, b"data").unwrap();

    let cli = parse(&[
        "vidupe",
        "-q",
        "compare",
        dir.path().join("missing.h264").to_str().unwrap(),
        present.to_str().unwrap(),
    ]);
    let err = vidupe::run_app(cli).unwrap_err();
    assert!(err.to_string().contains("missing.h264"));
}

#[test]
fn test_structured_error_json() {
    let err = anyhow::anyhow!("something broke");
    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    let json = serde_json::to_string(&structured).unwrap();
    assert!(json.contains("\"code\":\"VD001\""));
    assert!(json.contains("\"exit_code\":1"));
    assert!(json.contains("something broke"));
}

#[test]
fn test_exit_code_prefixes() {
    assert_eq!(ExitCode::Success.code_prefix(), "VD000");
    assert_eq!(ExitCode::NoMatches.as_i32(), 2);
    assert_eq!(ExitCode::PartialSuccess.as_i32(), 3);
    assert_eq!(ExitCode::Interrupted.as_i32(), 130);
}
