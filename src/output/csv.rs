//! CSV report for spreadsheets and data analysis.
//!
//! One row is written per match.
//!
//! # Columns
//!
//! - `folder`: folder whose streams were compared
//! - `small` / `large`: stream labels
//! - `kind`: `complete`, `prefix` or `suffix`
//! - `threshold`: threshold percentage in effect
//! - `small_size` / `large_size`: trimmed stream sizes in bytes
//! - `small_path` / `large_path`: extracted stream paths

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::RunReport;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    folder: String,
    small: &'a str,
    large: &'a str,
    kind: &'static str,
    threshold: f64,
    small_size: u64,
    large_size: u64,
    small_path: String,
    large_path: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a RunReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    /// Write the header and one row per match.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut rows = 0usize;

        for folder in &self.report.folders {
            let folder_name = folder.folder.to_string_lossy();
            for pair in &folder.matches {
                csv_writer.serialize(CsvRow {
                    folder: folder_name.to_string(),
                    small: &pair.small,
                    large: &pair.large,
                    kind: pair.kind.as_str(),
                    threshold: pair.threshold,
                    small_size: pair.small_size,
                    large_size: pair.large_size,
                    small_path: pair.small_path.to_string_lossy().into_owned(),
                    large_path: pair.large_path.to_string_lossy().into_owned(),
                })?;
                rows += 1;
            }
        }

        // serialize() emits the header with the first row only
        if rows == 0 {
            csv_writer.write_record([
                "folder",
                "small",
                "large",
                "kind",
                "threshold",
                "small_size",
                "large_size",
                "small_path",
                "large_path",
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
