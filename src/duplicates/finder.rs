//! Duplicate detection engine over a set of normalized streams.
//!
//! # Overview
//!
//! The engine orders streams by size, largest first, and sweeps over every
//! `(small, large)` pair where the large candidate ranks before the small one:
//!
//! 1. Small candidates are taken from the end of the ordering (smallest first).
//! 2. Each small candidate is compared against the larger streams from the
//!    largest down, using [`SubsequenceMatcher`].
//! 3. The first larger stream that matches is recorded and the rest of that
//!    small candidate's comparisons are skipped.
//!
//! A clear duplicate is usually found against the first few candidates, so
//! the early exit keeps the common case cheap even though the worst case is
//! quadratic.
//!
//! # Example
//!
//! ```no_run
//! use vidupe::duplicates::{DuplicateFinder, FinderConfig};
//! use vidupe::streams::Threshold;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let threshold = Threshold::new(95.0).unwrap();
//! let (matches, summary) = finder
//!     .detect_in_folder(Path::new("/tmp/normalized"), threshold)
//!     .unwrap();
//!
//! for pair in &matches {
//!     println!("{}", pair.describe());
//! }
//! println!("{} comparisons performed", summary.comparisons);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::MatchPair;
use crate::progress::{ProgressCallback, PHASE_COMPARE};
use crate::streams::{list_streams, Stream, StreamError, SubsequenceMatcher, Threshold};

/// Streams above this size are announced at debug level before loading.
const LARGE_STREAM_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Worker threads for the comparison sweep.
    /// Default is 1, a fully sequential sweep.
    pub threads: usize,
    /// Abort on the first stream read failure instead of skipping the stream.
    pub strict: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("threads", &self.threads)
            .field("strict", &self.strict)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            strict: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of worker threads (minimum 1).
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

    /// Check if shutdown has been requested.
    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from one detection sweep.
#[derive(Debug, Default)]
pub struct DetectSummary {
    /// Streams handed to the engine
    pub total_streams: usize,
    /// Zero-length streams left out of the sweep
    pub empty_streams: usize,
    /// Worst-case number of comparisons, `n(n-1)/2` over non-empty streams
    pub total_comparisons: usize,
    /// Comparisons actually performed
    pub comparisons: usize,
    /// Number of recorded matches
    pub matches: usize,
    /// Streams excluded after a read failure
    pub failed_streams: usize,
    /// Read failures, ordered by path
    pub errors: Vec<StreamError>,
    /// Wall time of the sweep
    pub duration: Duration,
}

impl DetectSummary {
    /// Comparisons avoided by early exits and failed streams.
    #[must_use]
    pub fn skipped_comparisons(&self) -> usize {
        self.total_comparisons.saturating_sub(self.comparisons)
    }
}

/// Errors that can occur during duplicate detection.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The sweep was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Comparison interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A stream could not be listed or read.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Sort streams by size, largest first. Equal sizes keep their input order.
pub fn sort_by_size_desc(streams: &mut [Stream]) {
    streams.sort_by(|a, b| b.size.cmp(&a.size));
}

/// Worst-case number of pairwise comparisons for `n` streams.
///
/// ```
/// use vidupe::duplicates::total_comparisons;
///
/// assert_eq!(total_comparisons(0), 0);
/// assert_eq!(total_comparisons(1), 0);
/// assert_eq!(total_comparisons(4), 6);
/// ```
#[must_use]
pub fn total_comparisons(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of scanning one small candidate.
enum SmallOutcome {
    Matched(MatchPair),
    Unmatched,
    Failed,
    Interrupted,
}

/// Shared state of one sweep; safe to use from several workers.
struct Sweep<'a> {
    streams: &'a [Stream],
    threshold: Threshold,
    config: &'a FinderConfig,
    failed: Mutex<HashSet<usize>>,
    errors: Mutex<Vec<StreamError>>,
    performed: AtomicUsize,
    position: AtomicUsize,
}

impl<'a> Sweep<'a> {
    fn new(streams: &'a [Stream], threshold: Threshold, config: &'a FinderConfig) -> Self {
        Self {
            streams,
            threshold,
            config,
            failed: Mutex::new(HashSet::new()),
            errors: Mutex::new(Vec::new()),
            performed: AtomicUsize::new(0),
            position: AtomicUsize::new(0),
        }
    }

    fn has_failures(&self) -> bool {
        !lock(&self.failed).is_empty()
    }

    fn is_failed(&self, idx: usize) -> bool {
        lock(&self.failed).contains(&idx)
    }

    fn record_failure(&self, idx: usize, err: StreamError) -> Result<(), FinderError> {
        if self.config.strict {
            return Err(FinderError::Stream(err));
        }
        if lock(&self.failed).insert(idx) {
            log::warn!(
                "Excluding {} from further comparisons: {}",
                self.streams[idx].label,
                err
            );
            lock(&self.errors).push(err);
        }
        Ok(())
    }

    fn advance(&self, by: usize, label: &str) {
        let current = self.position.fetch_add(by, Ordering::SeqCst) + by;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(current, label);
        }
    }

    fn load(&self, idx: usize) -> Result<Option<Vec<u8>>, FinderError> {
        let stream = &self.streams[idx];
        if stream.size > LARGE_STREAM_THRESHOLD {
            log::debug!(
                "Loading large stream ({}): {}",
                ByteSize::b(stream.size),
                stream.path.display()
            );
        }
        match stream.read() {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                self.record_failure(idx, e)?;
                Ok(None)
            }
        }
    }

    /// Compare small candidate `i` against every larger-ranked stream.
    fn scan_small(&self, i: usize) -> Result<SmallOutcome, FinderError> {
        let small = &self.streams[i];

        if self.config.is_shutdown_requested() {
            return Ok(SmallOutcome::Interrupted);
        }
        if self.is_failed(i) {
            self.advance(i, &small.label);
            return Ok(SmallOutcome::Failed);
        }
        let Some(small_data) = self.load(i)? else {
            self.advance(i, &small.label);
            return Ok(SmallOutcome::Failed);
        };
        let matcher = SubsequenceMatcher::new(&small_data, self.threshold);

        for (j, large) in self.streams[..i].iter().enumerate() {
            if self.config.is_shutdown_requested() {
                return Ok(SmallOutcome::Interrupted);
            }
            if self.is_failed(j) {
                self.advance(1, &small.label);
                continue;
            }
            let Some(large_data) = self.load(j)? else {
                self.advance(1, &small.label);
                continue;
            };

            log::debug!(
                "Comparing {} (size: {}) to {} (size: {})...",
                small.label,
                ByteSize::b(small.size),
                large.label,
                ByteSize::b(large.size)
            );
            self.performed.fetch_add(1, Ordering::SeqCst);
            let found = matcher.find_in(&large_data);
            drop(large_data);
            self.advance(1, &small.label);

            if let Some(kind) = found {
                log::info!(
                    "{} matches {} ({} match). Skipping further comparisons for {}.",
                    small.label,
                    large.label,
                    kind,
                    small.label
                );
                let remaining = i - j - 1;
                if remaining > 0 {
                    self.advance(remaining, &small.label);
                }
                return Ok(SmallOutcome::Matched(MatchPair::new(
                    small,
                    large,
                    kind,
                    self.threshold,
                )));
            }
            log::trace!("No match between {} and {}", small.label, large.label);
        }

        Ok(SmallOutcome::Unmatched)
    }
}

/// Duplicate finder that runs the size-ordered comparison sweep.
///
/// # Example
///
/// ```
/// use vidupe::duplicates::DuplicateFinder;
/// use vidupe::streams::Threshold;
///
/// let finder = DuplicateFinder::with_defaults();
/// let (matches, summary) = finder.detect(Vec::new(), Threshold::default()).unwrap();
/// assert!(matches.is_empty());
/// assert_eq!(summary.total_streams, 0);
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Detect matches among the regular files directly inside `path`.
    ///
    /// Streams are taken in file name order before size sorting, so equal
    /// sizes are ranked by file name.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if the path is missing or not a directory, if
    /// the folder cannot be listed, or as described for [`detect`](Self::detect).
    pub fn detect_in_folder(
        &self,
        path: &Path,
        threshold: Threshold,
    ) -> Result<(Vec<MatchPair>, DetectSummary), FinderError> {
        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        let streams = list_streams(path)?;
        log::info!("Comparing videos in {}...", path.display());
        self.detect(streams, threshold)
    }

    /// Detect matches among `streams`.
    ///
    /// Returns matches in discovery order: small candidates from the smallest
    /// up, each paired with the first (largest-first) stream it matches. For
    /// streams `M ⊃ X ⊃ Y` the result is `[(Y, M), (X, M)]`; reverse it for a
    /// largest-small-first listing. The order is the same for any thread
    /// count.
    ///
    /// Zero-length streams are left out with a warning and counted in
    /// [`DetectSummary::empty_streams`]. An empty buffer is trivially
    /// contained in any other, so comparing it would only report noise.
    ///
    /// When a read fails during a parallel sweep, which comparisons saw the
    /// failed stream depends on worker timing. The sweep is then repeated
    /// sequentially so the result matches a single-threaded run.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Interrupted` if the shutdown flag is raised, or
    /// `FinderError::Stream` on the first read failure in strict mode.
    /// Otherwise read failures exclude the stream and are listed in the
    /// summary.
    pub fn detect(
        &self,
        streams: Vec<Stream>,
        threshold: Threshold,
    ) -> Result<(Vec<MatchPair>, DetectSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = DetectSummary {
            total_streams: streams.len(),
            ..Default::default()
        };

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (mut streams, empty): (Vec<Stream>, Vec<Stream>) =
            streams.into_iter().partition(|s| s.size > 0);
        for stream in &empty {
            log::warn!("Skipping empty stream {}", stream.path.display());
        }
        summary.empty_streams = empty.len();

        sort_by_size_desc(&mut streams);
        let n = streams.len();
        summary.total_comparisons = total_comparisons(n);

        if n < 2 {
            log::debug!("Fewer than two streams, nothing to compare");
            summary.duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_COMPARE, summary.total_comparisons);
        }
        log::info!(
            "Comparing {} streams (at most {} comparisons) at {}% threshold",
            n,
            summary.total_comparisons,
            threshold
        );

        let order: Vec<usize> = (1..n).rev().collect();
        let mut sweep = Sweep::new(&streams, threshold, &self.config);
        let mut outcomes = self.run_sweep(&sweep, &order)?;

        let stopped = outcomes
            .iter()
            .any(|o| matches!(o, SmallOutcome::Interrupted));
        if self.config.threads > 1 && !stopped && sweep.has_failures() {
            log::warn!("Read failures during the parallel sweep, repeating it sequentially");
            sweep = Sweep::new(&streams, threshold, &self.config);
            if let Some(ref callback) = self.config.progress_callback {
                callback.on_phase_start(PHASE_COMPARE, summary.total_comparisons);
            }
            outcomes = sweep_sequential(&sweep, &order)?;
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_COMPARE);
        }

        let interrupted = outcomes
            .iter()
            .any(|o| matches!(o, SmallOutcome::Interrupted));
        if interrupted || self.config.is_shutdown_requested() {
            log::info!("Comparison interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }

        let matches: Vec<MatchPair> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                SmallOutcome::Matched(pair) => Some(pair),
                SmallOutcome::Unmatched | SmallOutcome::Failed | SmallOutcome::Interrupted => {
                    None
                }
            })
            .collect();

        let Sweep {
            failed,
            errors,
            performed,
            ..
        } = sweep;
        let mut errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        errors.sort_by(|a, b| a.path().cmp(b.path()));

        summary.matches = matches.len();
        summary.comparisons = performed.into_inner();
        summary.failed_streams = failed.into_inner().unwrap_or_else(PoisonError::into_inner).len();
        summary.errors = errors;
        summary.duration = start_time.elapsed();

        log::info!(
            "Comparison complete: {} matches, {} of {} comparisons performed, {} streams failed",
            summary.matches,
            summary.comparisons,
            summary.total_comparisons,
            summary.failed_streams
        );

        Ok((matches, summary))
    }

    fn run_sweep(
        &self,
        sweep: &Sweep<'_>,
        order: &[usize],
    ) -> Result<Vec<SmallOutcome>, FinderError> {
        if self.config.threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
            {
                Ok(pool) => {
                    return pool.install(|| {
                        order
                            .par_iter()
                            .map(|&i| sweep.scan_small(i))
                            .collect::<Result<Vec<_>, _>>()
                    });
                }
                Err(e) => {
                    log::warn!("Failed to create thread pool, comparing sequentially: {}", e);
                }
            }
        }

        sweep_sequential(sweep, order)
    }
}

fn sweep_sequential(
    sweep: &Sweep<'_>,
    order: &[usize],
) -> Result<Vec<SmallOutcome>, FinderError> {
    let mut outcomes = Vec::with_capacity(order.len());
    for &i in order {
        let outcome = sweep.scan_small(i)?;
        let stop = matches!(outcome, SmallOutcome::Interrupted);
        outcomes.push(outcome);
        if stop {
            break;
        }
    }
    Ok(outcomes)
}
