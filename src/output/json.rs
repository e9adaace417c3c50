//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00+00:00",
//!   "base": "/media/Movies",
//!   "mode": "check-movie-folder",
//!   "threshold": 95.0,
//!   "folders": [
//!     {
//!       "folder": "/media/Movies/Movie 1",
//!       "containers": 3,
//!       "extracted": 3,
//!       "compared_streams": 3,
//!       "matches": [
//!         {
//!           "small": "Trailer",
//!           "large": "Movie",
//!           "small_path": "/tmp/vidupe-x/Trailer_trimmed.h264",
//!           "large_path": "/tmp/vidupe-x/Movie_trimmed.h264",
//!           "small_size": 6291456,
//!           "large_size": 8388608,
//!           "kind": "complete",
//!           "threshold": 95.0
//!         }
//!       ],
//!       "skipped": [],
//!       "errors": [],
//!       "comparisons": 2,
//!       "total_comparisons": 3
//!     }
//!   ],
//!   "failures": [],
//!   "summary": {
//!     "folders_processed": 1,
//!     "folders_failed": 0,
//!     "total_matches": 1,
//!     "duration_ms": 1234,
//!     "interrupted": false,
//!     "exit_code": 0,
//!     "exit_code_name": "VD000"
//!   }
//! }
//! ```
//!
//! Stream paths point into per-folder workspaces that are deleted once the
//! folder finishes; labels are the stable identifiers.

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{FolderFailure, FolderReport, RunReport, ScanMode};

/// Run totals.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Folders that completed
    pub folders_processed: usize,
    /// Folders that failed
    pub folders_failed: usize,
    /// Matches across all folders
    pub total_matches: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "VD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Totals of a finished run.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        let exit_code = report.exit_code();
        Self {
            folders_processed: report.folders.len(),
            folders_failed: report.failures.len(),
            total_matches: report.total_matches(),
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            interrupted: report.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// RFC 3339 generation time
    pub generated_at: String,
    /// Base folder scanned
    pub base: String,
    /// Scan mode used
    pub mode: ScanMode,
    /// Threshold used
    pub threshold: f64,
    /// Per-folder results
    pub folders: Vec<FolderReport>,
    /// Folders that failed
    pub failures: Vec<FolderFailure>,
    /// Run totals
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Snapshot a run report.
    #[must_use]
    pub fn new(report: &RunReport) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            base: report.base.to_string_lossy().into_owned(),
            mode: report.mode,
            threshold: report.threshold.value(),
            folders: report.folders.clone(),
            failures: report.failures.clone(),
            summary: JsonSummary::from_report(report),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
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
