//! Report formatters for a finished run.
//!
//! - [`TextOutput`]: human-readable report for the terminal
//! - [`JsonOutput`]: machine-readable document for automation
//! - [`CsvOutput`]: one row per match for spreadsheets
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidupe::output::TextOutput;
//! use vidupe::pipeline::{MkvExtract, Pipeline, PipelineConfig, ScanMode};
//! use std::path::Path;
//!
//! let demuxer = Arc::new(MkvExtract::locate(None).unwrap());
//! let pipeline = Pipeline::new(PipelineConfig::default(), demuxer);
//! let report = pipeline.run(Path::new("/media/Movies"), ScanMode::CheckFolder).unwrap();
//!
//! TextOutput::new(&report, false)
//!     .write_to(&mut std::io::stdout())
//!     .unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
