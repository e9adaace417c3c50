//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports three phases per folder:
//! - `extract`: one step per container demuxed
//! - `normalize`: one step per extracted stream trimmed
//! - `compare`: one step per pairwise comparison, including skipped ones
//!
//! [`Progress`] renders them as terminal bars; anything else implementing
//! [`ProgressCallback`] can observe the same events.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for container demuxing.
pub const PHASE_EXTRACT: &str = "extract";
/// Phase name for header/footer trimming.
pub const PHASE_NORMALIZE: &str = "normalize";
/// Phase name for the comparison sweep.
pub const PHASE_COMPARE: &str = "compare";

/// Progress callback for the detection pipeline.
///
/// Implement this trait to receive progress updates while a folder is
/// extracted, normalized and compared.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (`extract`, `normalize` or `compare`)
    /// * `total` - Total number of steps in the phase
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called as steps complete.
    ///
    /// # Arguments
    ///
    /// * `current` - Steps completed so far
    /// * `item` - Label or path of the item being processed
    fn on_progress(&self, current: usize, item: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to set a message shown alongside the active bar.
    fn on_message(&self, _message: &str) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress reporter using indicatif.
///
/// Only one phase is active at a time; starting a new phase replaces the
/// previous bar.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    prefix: Mutex<String>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use vidupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            prefix: Mutex::new(String::new()),
            quiet,
        }
    }

    fn style_for(phase: &str) -> ProgressStyle {
        let template = match phase {
            PHASE_EXTRACT => {
                "{spinner:.green} [{elapsed_precise}] [{bar:40.yellow/blue}] {pos}/{len} {msg}"
            }
            PHASE_COMPARE => {
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} {per_sec} (ETA: {eta})"
            }
            _ => "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }

    fn label_for(phase: &str) -> &str {
        match phase {
            PHASE_EXTRACT => "Extracting",
            PHASE_NORMALIZE => "Normalizing",
            PHASE_COMPARE => "Comparing",
            other => other,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::style_for(phase));
        pb.set_message(Self::label_for(phase).to_string());
        if phase == PHASE_EXTRACT {
            pb.enable_steady_tick(Duration::from_millis(100));
        }

        if let Some(previous) = lock(&self.active).replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, item: &str) {
        if self.quiet {
            return;
        }

        let prefix = lock(&self.prefix).clone();
        let display_msg = if prefix.is_empty() {
            truncate_path(item, 30)
        } else {
            format!("{}: {}", prefix, truncate_path(item, 30))
        };

        if let Some(ref pb) = *lock(&self.active) {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = lock(&self.active).take() {
            pb.finish_with_message(format!("{} complete", Self::label_for(phase)));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        *lock(&self.prefix) = message.to_string();
        if let Some(ref pb) = *lock(&self.active) {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = file_name.chars().skip(name_len - keep).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
