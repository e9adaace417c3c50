//! Folder selection and container discovery.
//!
//! A scan is split into [`FolderJob`]s according to the [`ScanMode`]; each
//! job is processed independently and owns its own match list. Containers
//! are found with [`walkdir`], filtered by extension and sorted by path so
//! repeated runs extract in the same order.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// How the base folder is split into comparison sets.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Compare every container under the base folder, recursively, as one set.
    #[default]
    CheckFolder,
    /// One set per immediate subfolder of the base (a movie), recursively.
    CheckMovieFolder,
    /// One set per subfolder of each movie folder (extras), non-recursive.
    CheckExtrasFolder,
}

impl ScanMode {
    /// Name as used on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckFolder => "check-folder",
            Self::CheckMovieFolder => "check-movie-folder",
            Self::CheckExtrasFolder => "check-extras-folder",
        }
    }

    /// Whether containers are collected from nested folders too.
    #[must_use]
    pub fn is_recursive(self) -> bool {
        !matches!(self, Self::CheckExtrasFolder)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One folder whose containers form a comparison set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderJob {
    /// Folder to collect containers from
    pub folder: PathBuf,
    /// Descend into nested folders
    pub recursive: bool,
}

impl FolderJob {
    /// Create a job for `folder`.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            folder: folder.into(),
            recursive,
        }
    }
}

/// Errors that can occur while planning jobs or collecting containers.
#[derive(thiserror::Error, Debug)]
pub enum TraversalError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The folder could not be read.
    #[error("Cannot read {path}: {source}")]
    Walk {
        /// Folder being read
        path: PathBuf,
        /// The underlying walk error
        #[source]
        source: walkdir::Error,
    },
}

fn check_dir(path: &Path) -> Result<(), TraversalError> {
    if !path.exists() {
        return Err(TraversalError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(TraversalError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Split `base` into folder jobs for `mode`.
///
/// # Errors
///
/// Returns `TraversalError` if `base` is missing, is not a directory or
/// cannot be listed. In extras mode an unreadable movie folder is logged
/// and skipped.
pub fn plan_jobs(base: &Path, mode: ScanMode) -> Result<Vec<FolderJob>, TraversalError> {
    check_dir(base)?;

    let jobs = match mode {
        ScanMode::CheckFolder => vec![FolderJob::new(base, true)],
        ScanMode::CheckMovieFolder => subdirectories(base)?
            .into_iter()
            .map(|folder| FolderJob::new(folder, true))
            .collect(),
        ScanMode::CheckExtrasFolder => {
            let mut jobs = Vec::new();
            for movie in subdirectories(base)? {
                match subdirectories(&movie) {
                    Ok(extras) => {
                        jobs.extend(extras.into_iter().map(|folder| FolderJob::new(folder, false)));
                    }
                    Err(e) => log::warn!("Skipping {}: {}", movie.display(), e),
                }
            }
            jobs
        }
    };

    log::debug!(
        "Planned {} folder job(s) under {} in {} mode",
        jobs.len(),
        base.display(),
        mode
    );
    Ok(jobs)
}

/// Immediate subdirectories of `folder`, sorted by name.
fn subdirectories(folder: &Path) -> Result<Vec<PathBuf>, TraversalError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.path().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => {
                return Err(TraversalError::Walk {
                    path: folder.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => log::warn!("Skipping unreadable entry in {}: {}", folder.display(), e),
        }
    }
    Ok(dirs)
}

/// Whether `path` has one of `extensions`, compared case-insensitively.
///
/// A leading dot in a configured extension is ignored.
///
/// ```
/// use vidupe::pipeline::traversal::has_extension;
/// use std::path::Path;
///
/// let exts = vec!["mkv".to_string()];
/// assert!(has_extension(Path::new("Movie.MKV"), &exts));
/// assert!(!has_extension(Path::new("Movie.mp4"), &exts));
/// ```
#[must_use]
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Container files of `job`, sorted by path.
///
/// # Errors
///
/// Returns `TraversalError` if the job folder is missing or cannot be
/// listed. Unreadable nested entries are logged and skipped.
pub fn collect_containers(
    job: &FolderJob,
    extensions: &[String],
) -> Result<Vec<PathBuf>, TraversalError> {
    check_dir(&job.folder)?;

    let max_depth = if job.recursive { usize::MAX } else { 1 };
    let mut containers = Vec::new();

    for entry in WalkDir::new(&job.folder)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                    containers.push(entry.into_path());
                }
            }
            Err(e) if e.depth() == 0 => {
                return Err(TraversalError::Walk {
                    path: job.folder.clone(),
                    source: e,
                })
            }
            Err(e) => log::warn!("Skipping unreadable entry: {}", e),
        }
    }

    containers.sort();
    log::debug!(
        "Found {} container(s) in {}",
        containers.len(),
        job.folder.display()
    );
    Ok(containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mkv() -> Vec<String> {
        vec!["mkv".to_string()]
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("Movie 1/Video1.mkv"));
        touch(&root.join("Movie 1/Extras/Deleted.mkv"));
        touch(&root.join("Movie 1/Extras/Notes.txt"));
        touch(&root.join("Movie 1/Behind/Making.MKV"));
        touch(&root.join("Movie 2/Video2.mkv"));
        touch(&root.join("Movie 2/Interviews/Cast.mkv"));
        touch(&root.join("Movie 2/Interviews/Deep/Nested.mkv"));
        touch(&root.join("loose.mkv"));
        dir
    }

    fn rel(base: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(base)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_scan_mode_names() {
        assert_eq!(ScanMode::CheckFolder.to_string(), "check-folder");
        assert_eq!(ScanMode::CheckMovieFolder.as_str(), "check-movie-folder");
        assert_eq!(ScanMode::CheckExtrasFolder.as_str(), "check-extras-folder");
        assert!(ScanMode::CheckFolder.is_recursive());
        assert!(!ScanMode::CheckExtrasFolder.is_recursive());
    }

    #[test]
    fn test_plan_check_folder() {
        let dir = library();
        let jobs = plan_jobs(dir.path(), ScanMode::CheckFolder).unwrap();
        assert_eq!(jobs, vec![FolderJob::new(dir.path(), true)]);
    }

    #[test]
    fn test_plan_movie_folders() {
        let dir = library();
        let jobs = plan_jobs(dir.path(), ScanMode::CheckMovieFolder).unwrap();
        let folders: Vec<PathBuf> = jobs.iter().map(|j| j.folder.clone()).collect();
        assert_eq!(rel(dir.path(), &folders), vec!["Movie 1", "Movie 2"]);
        assert!(jobs.iter().all(|j| j.recursive));
    }

    #[test]
    fn test_plan_extras_folders() {
        let dir = library();
        let jobs = plan_jobs(dir.path(), ScanMode::CheckExtrasFolder).unwrap();
        let folders: Vec<PathBuf> = jobs.iter().map(|j| j.folder.clone()).collect();
        assert_eq!(
            rel(dir.path(), &folders),
            vec!["Movie 1/Behind", "Movie 1/Extras", "Movie 2/Interviews"]
        );
        assert!(jobs.iter().all(|j| !j.recursive));
    }

    #[test]
    fn test_plan_missing_base() {
        let dir = TempDir::new().unwrap();
        let err = plan_jobs(&dir.path().join("missing"), ScanMode::CheckFolder).unwrap_err();
        assert!(matches!(err, TraversalError::NotFound(_)));
    }

    #[test]
    fn test_plan_base_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.mkv");
        touch(&file);
        let err = plan_jobs(&file, ScanMode::CheckMovieFolder).unwrap_err();
        assert!(matches!(err, TraversalError::NotADirectory(_)));
    }

    #[test]
    fn test_collect_recursive() {
        let dir = library();
        let job = FolderJob::new(dir.path().join("Movie 2"), true);
        let found = collect_containers(&job, &mkv()).unwrap();
        assert_eq!(
            rel(dir.path(), &found),
            vec![
                "Movie 2/Interviews/Cast.mkv",
                "Movie 2/Interviews/Deep/Nested.mkv",
                "Movie 2/Video2.mkv"
            ]
        );
    }

    #[test]
    fn test_collect_non_recursive() {
        let dir = library();
        let job = FolderJob::new(dir.path().join("Movie 2/Interviews"), false);
        let found = collect_containers(&job, &mkv()).unwrap();
        assert_eq!(rel(dir.path(), &found), vec!["Movie 2/Interviews/Cast.mkv"]);
    }

    #[test]
    fn test_collect_extension_case_insensitive() {
        let dir = library();
        let job = FolderJob::new(dir.path().join("Movie 1/Behind"), false);
        let found = collect_containers(&job, &[".mkv".to_string()]).unwrap();
        assert_eq!(rel(dir.path(), &found), vec!["Movie 1/Behind/Making.MKV"]);
    }

    #[test]
    fn test_collect_other_extensions() {
        let dir = library();
        let job = FolderJob::new(dir.path().join("Movie 1/Extras"), false);
        let exts = vec!["txt".to_string()];
        let found = collect_containers(&job, &exts).unwrap();
        assert_eq!(rel(dir.path(), &found), vec!["Movie 1/Extras/Notes.txt"]);
    }

    #[test]
    fn test_collect_missing_folder() {
        let dir = TempDir::new().unwrap();
        let job = FolderJob::new(dir.path().join("gone"), true);
        assert!(matches!(
            collect_containers(&job, &mkv()),
            Err(TraversalError::NotFound(_))
        ));
    }

    #[test]
    fn test_has_extension_without_extension() {
        assert!(!has_extension(Path::new("README"), &mkv()));
    }
}
