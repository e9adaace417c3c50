//! Raw elementary streams and the byte-level operations on them.
//!
//! This module provides functionality for:
//! - Describing a stream file on disk ([`Stream`])
//! - Trimming volatile header/footer bytes ([`normalizer`])
//! - Deciding whether one stream is contained in another ([`matcher`])
//!
//! # Example
//!
//! ```no_run
//! use vidupe::streams::{list_streams, Normalizer, ShortStreamPolicy};
//! use std::path::Path;
//!
//! let folder = Path::new("/tmp/extracted");
//! let normalizer = Normalizer::new(1024 * 1024, 1024 * 1024, ShortStreamPolicy::Skip);
//! let report = normalizer.normalize_folder(folder).unwrap();
//! println!("{} streams normalized", report.normalized.len());
//!
//! for stream in list_streams(folder).unwrap() {
//!     println!("{}: {} bytes", stream.label, stream.size);
//! }
//! ```

pub mod matcher;
pub mod normalizer;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use matcher::{find_match, is_match, MatchKind, SubsequenceMatcher, Threshold, ThresholdError};
pub use normalizer::{
    NormalizeOutcome, NormalizeReport, Normalizer, ShortStreamPolicy, SKIPPED_DIR,
};

/// Suffix appended to the stem of every normalized stream file.
pub const TRIMMED_SUFFIX: &str = "_trimmed";

/// A stream file on disk.
///
/// Only metadata is held here; contents are loaded on demand with
/// [`Stream::read`] so that large payloads live only as long as a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    /// Path to the stream file
    pub path: PathBuf,
    /// Display label (basename without extension or trimming suffix)
    pub label: String,
    /// Length in bytes
    pub size: u64,
}

impl Stream {
    /// Create a stream description from a known path and size.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        let label = stream_label(&path);
        Self { path, label, size }
    }

    /// Create a stream description by reading the file's metadata.
    ///
    /// # Errors
    ///
    /// Returns `StreamError` if the metadata cannot be read or the path is
    /// not a regular file.
    pub fn from_path(path: &Path) -> Result<Self, StreamError> {
        let metadata = fs::metadata(path).map_err(|e| StreamError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(StreamError::NotAFile(path.to_path_buf()));
        }
        Ok(Self::new(path.to_path_buf(), metadata.len()))
    }

    /// Load the full contents of the stream.
    ///
    /// # Errors
    ///
    /// Returns `StreamError` on any read failure.
    pub fn read(&self) -> Result<Vec<u8>, StreamError> {
        fs::read(&self.path).map_err(|e| StreamError::from_io(&self.path, e))
    }
}

/// Derive the display label for a stream path.
///
/// The extension and a trailing [`TRIMMED_SUFFIX`] are removed, so
/// `Movie_trimmed.h264` and `Movie.h264` both label as `Movie`.
///
/// # Example
///
/// ```
/// use vidupe::streams::stream_label;
/// use std::path::Path;
///
/// assert_eq!(stream_label(Path::new("/tmp/Trailer_trimmed.h264")), "Trailer");
/// assert_eq!(stream_label(Path::new("Trailer.h264")), "Trailer");
/// ```
#[must_use]
pub fn stream_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.strip_suffix(TRIMMED_SUFFIX) {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => stem,
    }
}

/// List the regular files directly inside `folder` as streams.
///
/// Subdirectories are ignored. The result is ordered by file name so that
/// later size-sorting has a deterministic tie order.
///
/// # Errors
///
/// Returns `StreamError` if the folder is missing, not a directory, or
/// cannot be listed. Individual entries whose metadata cannot be read are
/// logged and skipped.
pub fn list_streams(folder: &Path) -> Result<Vec<Stream>, StreamError> {
    let mut streams: Vec<Stream> = regular_files(folder)?
        .into_iter()
        .filter_map(|path| match Stream::from_path(&path) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("Skipping stream {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    streams.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(streams)
}

/// Compare two stream files directly, without normalization.
///
/// The first argument is treated as the smaller stream regardless of size.
///
/// # Errors
///
/// Returns `StreamError` if either file cannot be read.
pub fn compare_files(
    small: &Path,
    large: &Path,
    threshold: Threshold,
) -> Result<Option<MatchKind>, StreamError> {
    let small_data = Stream::from_path(small)?.read()?;
    let large_data = Stream::from_path(large)?.read()?;
    Ok(find_match(&small_data, &large_data, threshold))
}

/// Regular files directly inside `folder`, sorted by file name.
pub(crate) fn regular_files(folder: &Path) -> Result<Vec<PathBuf>, StreamError> {
    if !folder.exists() {
        return Err(StreamError::NotFound(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(StreamError::NotADirectory(folder.to_path_buf()));
    }

    let entries = fs::read_dir(folder).map_err(|e| StreamError::from_io(folder, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StreamError::from_io(folder, e))?;
        match entry.file_type() {
            Ok(ft) if ft.is_file() => files.push(entry.path()),
            Ok(_) => log::trace!("Ignoring non-file entry {}", entry.path().display()),
            Err(e) => log::warn!("Cannot stat {}: {}", entry.path().display(), e),
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Errors that can occur while reading, listing or normalizing streams.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when accessing the path.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The specified path is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The stream is too short to remove both header and footer.
    #[error("{path} is too small to trim {header} header and {footer} footer bytes ({size} bytes)")]
    TooShort {
        /// Path of the stream
        path: PathBuf,
        /// Length of the stream in bytes
        size: u64,
        /// Header bytes requested
        header: u64,
        /// Footer bytes requested
        footer: u64,
    },

    /// An I/O error occurred while accessing a stream.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::NotADirectory(p)
            | Self::NotAFile(p) => p,
            Self::TooShort { path, .. } | Self::Io { path, .. } => path,
        }
    }
}
