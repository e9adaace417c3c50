//! Header/footer trimming for raw stream files.
//!
//! # Overview
//!
//! Extracted elementary streams carry container and codec framing at both
//! ends that differs between otherwise identical payloads. The [`Normalizer`]
//! removes a fixed number of bytes from each end of every stream file in a
//! folder, writing the kept range to `<stem>_trimmed<.ext>` and deleting the
//! original.
//!
//! Files with `size - header - footer <= 0` are too short to trim. Under
//! [`ShortStreamPolicy::Skip`] they are reported and moved, unmodified, into
//! the [`SKIPPED_DIR`] subfolder, so a folder listing after normalization
//! holds trimmed artifacts only. Under [`ShortStreamPolicy::Error`] the
//! folder fails.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{regular_files, StreamError, TRIMMED_SUFFIX};
use crate::progress::{ProgressCallback, PHASE_NORMALIZE};

/// Subfolder receiving streams too short to trim.
pub const SKIPPED_DIR: &str = "skipped";

/// What to do with a stream that is too short to trim.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ShortStreamPolicy {
    /// Report the stream and leave it out of the comparison set.
    #[default]
    Skip,
    /// Fail the whole folder.
    Error,
}

/// Result of normalizing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The file was trimmed; the original is gone and this is the new path.
    Trimmed(PathBuf),
    /// The file was too short and was left as is.
    TooShort {
        /// Length of the untouched file
        size: u64,
    },
}

/// Summary of a folder normalization.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// Paths of the trimmed artifacts, in file name order of their originals
    pub normalized: Vec<PathBuf>,
    /// Files left out because they were too short, with their sizes.
    /// Paths point into the [`SKIPPED_DIR`] subfolder.
    pub skipped: Vec<(PathBuf, u64)>,
    /// Per-file failures; those files are excluded
    pub errors: Vec<StreamError>,
}

impl NormalizeReport {
    /// Number of files that entered normalization.
    #[must_use]
    pub fn input_files(&self) -> usize {
        self.normalized.len() + self.skipped.len() + self.errors.len()
    }
}

/// Trims header and footer bytes from stream files.
#[derive(Clone)]
pub struct Normalizer {
    header: u64,
    footer: u64,
    policy: ShortStreamPolicy,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("header", &self.header)
            .field("footer", &self.footer)
            .field("policy", &self.policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Normalizer {
    /// Create a normalizer removing `header` leading and `footer` trailing bytes.
    #[must_use]
    pub fn new(header: u64, footer: u64, policy: ShortStreamPolicy) -> Self {
        Self {
            header,
            footer,
            policy,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Bytes kept from a file of `size` bytes, or `None` if nothing would remain.
    ///
    /// ```
    /// use vidupe::streams::{Normalizer, ShortStreamPolicy};
    ///
    /// let normalizer = Normalizer::new(10, 10, ShortStreamPolicy::Skip);
    /// assert_eq!(normalizer.keep_len(25), Some(5));
    /// assert_eq!(normalizer.keep_len(20), None);
    /// assert_eq!(normalizer.keep_len(3), None);
    /// ```
    #[must_use]
    pub fn keep_len(&self, size: u64) -> Option<u64> {
        size.checked_sub(self.header)
            .and_then(|rest| rest.checked_sub(self.footer))
            .filter(|&keep| keep > 0)
    }

    /// Normalize every regular file directly inside `folder`.
    ///
    /// # Errors
    ///
    /// Returns `StreamError` if the folder cannot be listed, or if a file is
    /// too short under [`ShortStreamPolicy::Error`]. Other per-file failures
    /// are collected in the report.
    pub fn normalize_folder(&self, folder: &Path) -> Result<NormalizeReport, StreamError> {
        let files = regular_files(folder)?;
        let mut report = NormalizeReport::default();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_NORMALIZE, files.len());
        }

        for (idx, path) in files.into_iter().enumerate() {
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(idx + 1, path.to_string_lossy().as_ref());
            }

            match self.normalize_file(&path) {
                Ok(NormalizeOutcome::Trimmed(trimmed)) => {
                    log::debug!("Processed file: {}", path.display());
                    report.normalized.push(trimmed);
                }
                Ok(NormalizeOutcome::TooShort { size }) => {
                    let err = StreamError::TooShort {
                        path: path.clone(),
                        size,
                        header: self.header,
                        footer: self.footer,
                    };
                    if self.policy == ShortStreamPolicy::Error {
                        return Err(err);
                    }
                    log::warn!("{}. Skipping.", err);
                    match set_aside(folder, &path) {
                        Ok(moved) => report.skipped.push((moved, size)),
                        Err(e) => {
                            log::warn!("Failed to set aside {}: {}", path.display(), e);
                            report.errors.push(e);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Failed to normalize {}: {}", path.display(), e);
                    report.errors.push(e);
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_NORMALIZE);
        }

        log::info!(
            "Normalized {} of {} streams ({} too short, {} failed)",
            report.normalized.len(),
            report.input_files(),
            report.skipped.len(),
            report.errors.len()
        );

        Ok(report)
    }

    /// Normalize a single file in place.
    ///
    /// On success the original is removed and the trimmed artifact's path is
    /// returned. A failed write removes the partial artifact and leaves the
    /// original untouched.
    ///
    /// # Errors
    ///
    /// Returns `StreamError` on any I/O failure.
    pub fn normalize_file(&self, path: &Path) -> Result<NormalizeOutcome, StreamError> {
        let mut input = File::open(path).map_err(|e| StreamError::from_io(path, e))?;
        let size = input
            .metadata()
            .map_err(|e| StreamError::from_io(path, e))?
            .len();

        let Some(keep) = self.keep_len(size) else {
            return Ok(NormalizeOutcome::TooShort { size });
        };

        let output = trimmed_path(path);
        let out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&output)
            .map_err(|e| StreamError::from_io(&output, e))?;

        if let Err(e) = self.copy_range(&mut input, out, keep) {
            if let Err(rm) = fs::remove_file(&output) {
                log::warn!(
                    "Failed to remove partial artifact {}: {}",
                    output.display(),
                    rm
                );
            }
            return Err(StreamError::from_io(&output, e));
        }
        drop(input);

        fs::remove_file(path).map_err(|e| StreamError::from_io(path, e))?;
        Ok(NormalizeOutcome::Trimmed(output))
    }

    fn copy_range(&self, input: &mut File, out: File, keep: u64) -> io::Result<()> {
        input.seek(SeekFrom::Start(self.header))?;
        let mut writer = BufWriter::new(out);
        let copied = io::copy(&mut input.take(keep), &mut writer)?;
        if copied != keep {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {keep} bytes, copied {copied}"),
            ));
        }
        writer.flush()?;
        Ok(())
    }
}

/// Move a too-short stream out of the comparison set, into `folder/skipped/`.
fn set_aside(folder: &Path, path: &Path) -> Result<PathBuf, StreamError> {
    let dir = folder.join(SKIPPED_DIR);
    fs::create_dir_all(&dir).map_err(|e| StreamError::from_io(&dir, e))?;
    let target = match path.file_name() {
        Some(name) => dir.join(name),
        None => return Err(StreamError::NotAFile(path.to_path_buf())),
    };
    fs::rename(path, &target).map_err(|e| StreamError::from_io(path, e))?;
    Ok(target)
}

/// Path of the trimmed artifact for `path`: `<stem>_trimmed<.ext>`.
///
/// ```
/// use vidupe::streams::normalizer::trimmed_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(trimmed_path(Path::new("/t/a.h264")), PathBuf::from("/t/a_trimmed.h264"));
/// assert_eq!(trimmed_path(Path::new("/t/raw")), PathBuf::from("/t/raw_trimmed"));
/// ```
#[must_use]
pub fn trimmed_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{TRIMMED_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{TRIMMED_SUFFIX}"),
    };
    path.with_file_name(name)
}
