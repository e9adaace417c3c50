//! End-to-end processing of a video library.
//!
//! # Overview
//!
//! For every [`FolderJob`] planned from the base folder, the pipeline:
//!
//! 1. **Collect**: find container files by extension
//! 2. **Extract**: demux each container into a fresh [`Workspace`]
//! 3. **Normalize**: trim header and footer bytes from every stream
//! 4. **Detect**: run the [`DuplicateFinder`] sweep over the trimmed streams
//!
//! A folder that fails is recorded in the [`RunReport`] and the remaining
//! folders still run. An interruption stops the run after the current
//! folder; matches already found are kept.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidupe::pipeline::{MkvExtract, Pipeline, PipelineConfig, ScanMode};
//! use std::path::Path;
//!
//! let demuxer = MkvExtract::locate(None).unwrap();
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(demuxer));
//! let report = pipeline.run(Path::new("/media/Movies"), ScanMode::CheckMovieFolder).unwrap();
//! println!("{} matches", report.total_matches());
//! ```

pub mod demux;
pub mod traversal;
pub mod workspace;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

pub use demux::{unique_output_path, DemuxError, Demuxer, MkvExtract, ToolLocator, ToolSource};
pub use traversal::{collect_containers, plan_jobs, FolderJob, ScanMode, TraversalError};
pub use workspace::Workspace;

use crate::duplicates::{DuplicateFinder, FinderConfig, FinderError, MatchPair};
use crate::error::ExitCode;
use crate::progress::{ProgressCallback, PHASE_EXTRACT};
use crate::streams::{
    stream_label, Normalizer, ShortStreamPolicy, Stream, StreamError, Threshold,
};

/// Default number of bytes trimmed from each end of a stream.
pub const DEFAULT_TRIM_BYTES: u64 = 1024 * 1024;

/// Settings for a pipeline run.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Match threshold
    pub threshold: Threshold,
    /// Bytes trimmed from the start of each stream
    pub header_bytes: u64,
    /// Bytes trimmed from the end of each stream
    pub footer_bytes: u64,
    /// Container extensions to collect, without the dot
    pub extensions: Vec<String>,
    /// Parent directory for workspaces; system temp when unset
    pub temp_dir: Option<PathBuf>,
    /// Worker threads for the comparison sweep
    pub threads: usize,
    /// Fail a folder on the first stream read error
    pub strict: bool,
    /// Handling of streams too short to trim
    pub short_streams: ShortStreamPolicy,
    /// Optional shutdown flag for graceful termination
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("threshold", &self.threshold)
            .field("header_bytes", &self.header_bytes)
            .field("footer_bytes", &self.footer_bytes)
            .field("extensions", &self.extensions)
            .field("temp_dir", &self.temp_dir)
            .field("threads", &self.threads)
            .field("strict", &self.strict)
            .field("short_streams", &self.short_streams)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            header_bytes: DEFAULT_TRIM_BYTES,
            footer_bytes: DEFAULT_TRIM_BYTES,
            extensions: vec!["mkv".to_string()],
            temp_dir: None,
            threads: 1,
            strict: false,
            short_streams: ShortStreamPolicy::Skip,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl PipelineConfig {
    /// Set the match threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the header and footer trim sizes.
    #[must_use]
    pub fn with_trim(mut self, header_bytes: u64, footer_bytes: u64) -> Self {
        self.header_bytes = header_bytes;
        self.footer_bytes = footer_bytes;
        self
    }

    /// Set the container extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the workspace parent directory.
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Set the number of comparison threads (minimum 1).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set fail-fast on stream read errors.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the too-short stream policy.
    #[must_use]
    pub fn with_short_streams(mut self, policy: ShortStreamPolicy) -> Self {
        self.short_streams = policy;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A non-fatal problem recorded against a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderIssue {
    /// File the problem concerns
    pub path: PathBuf,
    /// Human-readable description
    pub message: String,
}

impl FolderIssue {
    fn from_stream_error(err: &StreamError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// A stream left out because it was too short to trim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStream {
    /// Label of the stream (its container's file stem)
    pub label: String,
    /// Path of the extracted stream inside the workspace
    pub path: PathBuf,
    /// Its length in bytes
    pub size: u64,
}

/// Outcome of one folder job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    /// Folder the job covered
    pub folder: PathBuf,
    /// Containers found
    pub containers: usize,
    /// Streams successfully extracted
    pub extracted: usize,
    /// Streams that entered the comparison sweep
    pub compared_streams: usize,
    /// Matches in discovery order
    pub matches: Vec<MatchPair>,
    /// Streams too short to trim
    pub skipped: Vec<SkippedStream>,
    /// Extraction, normalization and read failures
    pub errors: Vec<FolderIssue>,
    /// Comparisons performed
    pub comparisons: usize,
    /// Worst-case comparisons
    pub total_comparisons: usize,
}

impl FolderReport {
    fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            ..Default::default()
        }
    }

    /// Whether any non-fatal failure was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A folder that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct FolderFailure {
    /// Folder the job covered
    pub folder: PathBuf,
    /// Why it failed
    pub error: String,
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Base folder scanned
    pub base: PathBuf,
    /// Mode the run used
    pub mode: ScanMode,
    /// Threshold the run used
    pub threshold: Threshold,
    /// Folders that completed, in processing order
    pub folders: Vec<FolderReport>,
    /// Folders that failed
    pub failures: Vec<FolderFailure>,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
    /// Wall time of the run
    pub duration: Duration,
}

impl RunReport {
    /// Matches across all folders.
    #[must_use]
    pub fn total_matches(&self) -> usize {
        self.folders.iter().map(|f| f.matches.len()).sum()
    }

    /// Folders that produced at least one match.
    pub fn matched_folders(&self) -> impl Iterator<Item = &FolderReport> {
        self.folders.iter().filter(|f| !f.matches.is_empty())
    }

    /// Whether any folder failed or recorded an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty() || self.folders.iter().any(FolderReport::has_errors)
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if self.folders.is_empty() && !self.failures.is_empty() {
            ExitCode::GeneralError
        } else if self.has_errors() {
            ExitCode::PartialSuccess
        } else if self.total_matches() > 0 {
            ExitCode::Success
        } else {
            ExitCode::NoMatches
        }
    }
}

/// Errors that abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The base folder could not be planned.
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// Errors that fail a single folder.
#[derive(thiserror::Error, Debug)]
pub enum FolderError {
    /// Containers could not be collected.
    #[error(transparent)]
    Traversal(#[from] TraversalError),

    /// The workspace could not be created.
    #[error("Failed to create workspace: {0}")]
    Workspace(#[source] io::Error),

    /// Normalization failed for the folder.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Detection failed for the folder.
    #[error(transparent)]
    Finder(FinderError),

    /// Processing stopped on a shutdown request.
    #[error("Processing interrupted by user")]
    Interrupted,
}

impl From<FinderError> for FolderError {
    fn from(err: FinderError) -> Self {
        match err {
            FinderError::Interrupted => Self::Interrupted,
            other => Self::Finder(other),
        }
    }
}

/// Drives collection, extraction, normalization and detection.
pub struct Pipeline {
    config: PipelineConfig,
    demuxer: Arc<dyn Demuxer>,
}

impl Pipeline {
    /// Create a pipeline using `demuxer` for extraction.
    #[must_use]
    pub fn new(config: PipelineConfig, demuxer: Arc<dyn Demuxer>) -> Self {
        Self { config, demuxer }
    }

    /// The pipeline's configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every folder `mode` selects under `base`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` only when no folder can be planned. Failures
    /// of individual folders are recorded in the report.
    pub fn run(&self, base: &Path, mode: ScanMode) -> Result<RunReport, PipelineError> {
        let start_time = Instant::now();
        let jobs = plan_jobs(base, mode)?;
        let total = jobs.len();

        let mut report = RunReport {
            base: base.to_path_buf(),
            mode,
            threshold: self.config.threshold,
            folders: Vec::with_capacity(total),
            failures: Vec::new(),
            interrupted: false,
            duration: Duration::ZERO,
        };

        log::info!(
            "Processing {} folder(s) under {} ({} mode, {}% threshold)",
            total,
            base.display(),
            mode,
            self.config.threshold
        );

        for (index, job) in jobs.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                report.interrupted = true;
                break;
            }

            log::info!(
                "Processing folder: {} (Folder {} of {})",
                job.folder.display(),
                index + 1,
                total
            );
            if let Some(ref callback) = self.config.progress_callback {
                callback.on_message(&format!("[{}/{}]", index + 1, total));
            }

            match self.process_folder(job) {
                Ok(folder) => report.folders.push(folder),
                Err(FolderError::Interrupted) => {
                    report.interrupted = true;
                    break;
                }
                Err(e) => {
                    log::error!("Folder {} failed: {}", job.folder.display(), e);
                    report.failures.push(FolderFailure {
                        folder: job.folder.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.duration = start_time.elapsed();
        log::info!(
            "Run complete: {} match(es) in {} folder(s), {} failed folder(s) in {:.3}s",
            report.total_matches(),
            report.folders.len(),
            report.failures.len(),
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    /// Run one folder job to completion.
    ///
    /// # Errors
    ///
    /// Returns `FolderError` if the folder cannot be listed, the workspace
    /// cannot be created, normalization fails under the error policy,
    /// detection fails in strict mode, or shutdown is requested.
    pub fn process_folder(&self, job: &FolderJob) -> Result<FolderReport, FolderError> {
        let containers = collect_containers(job, &self.config.extensions)?;
        let mut report = FolderReport::new(job.folder.clone());
        report.containers = containers.len();

        if containers.is_empty() {
            log::info!("No containers found in {}", job.folder.display());
            return Ok(report);
        }

        let workspace =
            Workspace::create(self.config.temp_dir.as_deref()).map_err(FolderError::Workspace)?;

        self.extract_all(&containers, workspace.path(), &mut report)?;
        if self.config.is_shutdown_requested() {
            return Err(FolderError::Interrupted);
        }

        let mut normalizer = Normalizer::new(
            self.config.header_bytes,
            self.config.footer_bytes,
            self.config.short_streams,
        );
        if let Some(ref callback) = self.config.progress_callback {
            normalizer = normalizer.with_progress_callback(Arc::clone(callback));
        }
        let normalized = normalizer.normalize_folder(workspace.path())?;

        report.skipped = normalized
            .skipped
            .iter()
            .map(|(path, size)| SkippedStream {
                label: stream_label(path),
                path: path.clone(),
                size: *size,
            })
            .collect();
        report
            .errors
            .extend(normalized.errors.iter().map(FolderIssue::from_stream_error));

        let mut streams = Vec::with_capacity(normalized.normalized.len());
        for path in &normalized.normalized {
            match Stream::from_path(path) {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    log::warn!("Skipping stream {}: {}", path.display(), e);
                    report.errors.push(FolderIssue::from_stream_error(&e));
                }
            }
        }
        streams.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        report.compared_streams = streams.len();

        let mut finder_config = FinderConfig::default()
            .with_threads(self.config.threads)
            .with_strict(self.config.strict);
        if let Some(ref flag) = self.config.shutdown_flag {
            finder_config = finder_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            finder_config = finder_config.with_progress_callback(Arc::clone(callback));
        }

        let (matches, summary) =
            DuplicateFinder::new(finder_config).detect(streams, self.config.threshold)?;

        report
            .errors
            .extend(summary.errors.iter().map(FolderIssue::from_stream_error));
        report.comparisons = summary.comparisons;
        report.total_comparisons = summary.total_comparisons;
        report.matches = matches;

        if let Err(e) = workspace.close() {
            log::warn!("Failed to remove workspace: {}", e);
        }

        Ok(report)
    }

    fn extract_all(
        &self,
        containers: &[PathBuf],
        output_dir: &Path,
        report: &mut FolderReport,
    ) -> Result<(), FolderError> {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_EXTRACT, containers.len());
        }

        for (idx, container) in containers.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                return Err(FolderError::Interrupted);
            }

            match self.demuxer.extract(container, output_dir) {
                Ok(output) => {
                    log::info!(
                        "Extracted video track from {} to {}",
                        container.display(),
                        output.display()
                    );
                    report.extracted += 1;
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.errors.push(FolderIssue {
                        path: container.clone(),
                        message: e.to_string(),
                    });
                }
            }

            if let Some(ref callback) = self.config.progress_callback {
                callback.on_progress(idx + 1, container.to_string_lossy().as_ref());
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_EXTRACT);
        }
        Ok(())
    }
}
