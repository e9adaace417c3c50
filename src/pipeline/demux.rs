//! Container demuxing through an external tool.
//!
//! # Overview
//!
//! A [`Demuxer`] turns one container file into one raw elementary stream
//! file inside a workspace folder. The shipped implementation,
//! [`MkvExtract`], shells out to MKVToolNix:
//!
//! ```text
//! mkvextract tracks <input> 0:<output_dir>/<stem>.h264
//! ```
//!
//! The executable is found by a [`ToolLocator`], which walks a list of
//! [`ToolSource`]s in order. An explicitly configured path is authoritative:
//! when it is set, no other location is searched.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Extension of extracted elementary streams.
pub const STREAM_EXTENSION: &str = "h264";

/// Maximum characters of tool output kept in an error.
const MAX_TOOL_OUTPUT: usize = 500;

/// Extracts the primary video track of a container into a raw stream file.
pub trait Demuxer: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Extract `input` into `output_dir`, returning the created file.
    ///
    /// Implementations must not overwrite an existing file in `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns `DemuxError` if the extraction fails.
    fn extract(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, DemuxError>;
}

/// Errors that can occur while locating or running a demuxer.
#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    /// The external tool could not be found.
    #[error(
        "Could not find '{tool}'. Install MKVToolNix, add it to PATH or set its location with --mkvextract (searched: {})",
        display_paths(.searched)
    )]
    ToolNotFound {
        /// Tool name
        tool: String,
        /// Every location that was checked
        searched: Vec<PathBuf>,
    },

    /// The input path has no usable file name.
    #[error("Invalid container path: {0}")]
    InvalidInput(PathBuf),

    /// The tool could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The tool ran but reported failure or produced nothing.
    #[error("Failed to extract video track from {input}{}: {message}", exit_suffix(*.code))]
    Failed {
        /// Container being extracted
        input: PathBuf,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Leading part of the tool's output
        message: String,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn exit_suffix(code: Option<i32>) -> String {
    code.map(|c| format!(" (exit code {})", c))
        .unwrap_or_default()
}

/// First `MAX_TOOL_OUTPUT` characters of the tool's diagnostic output.
fn tool_message(stdout: &[u8], stderr: &[u8]) -> String {
    // mkvextract reports errors on stdout
    let raw = if stderr.iter().any(|b| !b.is_ascii_whitespace()) {
        stderr
    } else {
        stdout
    };
    String::from_utf8_lossy(raw)
        .trim()
        .chars()
        .take(MAX_TOOL_OUTPUT)
        .collect()
}

/// A non-clobbering output path `<dir>/<stem>.<ext>`.
///
/// If that file exists, `<stem>_2.<ext>`, `<stem>_3.<ext>` and so on are
/// tried in turn.
#[must_use]
pub fn unique_output_path(output_dir: &Path, stem: &OsStr, extension: &str) -> PathBuf {
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    let candidate = output_dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let mut n = 2u32;
    loop {
        let mut name = stem.to_os_string();
        name.push(format!("_{}.{}", n, extension));
        let candidate = output_dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Demuxer backed by the `mkvextract` executable.
#[derive(Debug, Clone)]
pub struct MkvExtract {
    program: PathBuf,
}

impl MkvExtract {
    /// Tool name as searched on disk.
    pub const TOOL: &'static str = "mkvextract";

    /// Use the executable at `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `mkvextract`, honoring an explicitly configured path.
    ///
    /// # Errors
    ///
    /// Returns `DemuxError::ToolNotFound` if no candidate exists.
    pub fn locate(configured: Option<&Path>) -> Result<Self, DemuxError> {
        ToolLocator::mkvextract(configured).locate().map(Self::new)
    }

    /// Path of the executable in use.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Demuxer for MkvExtract {
    fn name(&self) -> &str {
        Self::TOOL
    }

    fn extract(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, DemuxError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| DemuxError::InvalidInput(input.to_path_buf()))?;
        let output = unique_output_path(output_dir, stem, STREAM_EXTENSION);

        let mut track_spec = OsString::from("0:");
        track_spec.push(output.as_os_str());

        log::debug!(
            "Running {} tracks {} {}",
            self.program.display(),
            input.display(),
            track_spec.to_string_lossy()
        );

        let result = Command::new(&self.program)
            .arg("tracks")
            .arg(input)
            .arg(&track_spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| DemuxError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            if output.exists() {
                let _ = fs::remove_file(&output);
            }
            return Err(DemuxError::Failed {
                input: input.to_path_buf(),
                code: result.status.code(),
                message: tool_message(&result.stdout, &result.stderr),
            });
        }

        if !output.is_file() {
            return Err(DemuxError::Failed {
                input: input.to_path_buf(),
                code: result.status.code(),
                message: "no output file was produced".to_string(),
            });
        }

        Ok(output)
    }
}

/// One place to look for an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// An exact executable path.
    Explicit(PathBuf),
    /// Every directory on `PATH`.
    SearchPath,
    /// A specific directory.
    Directory(PathBuf),
    /// The process's working directory.
    CurrentDir,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "configured path {}", p.display()),
            Self::SearchPath => f.write_str("PATH"),
            Self::Directory(p) => write!(f, "directory {}", p.display()),
            Self::CurrentDir => f.write_str("current directory"),
        }
    }
}

/// Ordered search for an external executable.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    tool: String,
    sources: Vec<ToolSource>,
}

impl ToolLocator {
    /// Create a locator for `tool` with no sources.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            sources: Vec::new(),
        }
    }

    /// Append a source to search.
    #[must_use]
    pub fn with_source(mut self, source: ToolSource) -> Self {
        self.sources.push(source);
        self
    }

    /// The standard chain for `mkvextract`.
    ///
    /// A configured path is the only source when present. Otherwise `PATH`,
    /// the platform's MKVToolNix install directories and the current
    /// directory are searched in that order.
    #[must_use]
    pub fn mkvextract(configured: Option<&Path>) -> Self {
        let locator = Self::new(MkvExtract::TOOL);
        if let Some(path) = configured {
            return locator.with_source(ToolSource::Explicit(path.to_path_buf()));
        }

        let mut locator = locator.with_source(ToolSource::SearchPath);
        for dir in default_install_dirs() {
            locator = locator.with_source(ToolSource::Directory(dir));
        }
        locator.with_source(ToolSource::CurrentDir)
    }

    /// Sources in search order.
    #[must_use]
    pub fn sources(&self) -> &[ToolSource] {
        &self.sources
    }

    /// File name of the executable on this platform.
    #[must_use]
    pub fn executable_name(&self) -> String {
        format!("{}{}", self.tool, env::consts::EXE_SUFFIX)
    }

    fn candidates(&self, source: &ToolSource) -> Vec<PathBuf> {
        let exe = self.executable_name();
        match source {
            ToolSource::Explicit(path) => vec![path.clone()],
            ToolSource::SearchPath => env::var_os("PATH")
                .map(|paths| env::split_paths(&paths).map(|dir| dir.join(&exe)).collect())
                .unwrap_or_default(),
            ToolSource::Directory(dir) => vec![dir.join(&exe)],
            ToolSource::CurrentDir => env::current_dir()
                .map(|dir| vec![dir.join(&exe)])
                .unwrap_or_default(),
        }
    }

    /// Return the first existing candidate.
    ///
    /// # Errors
    ///
    /// Returns `DemuxError::ToolNotFound` listing every checked location.
    pub fn locate(&self) -> Result<PathBuf, DemuxError> {
        let mut searched = Vec::new();
        for source in &self.sources {
            for candidate in self.candidates(source) {
                if candidate.is_file() {
                    log::debug!(
                        "Found {} via {}: {}",
                        self.tool,
                        source,
                        candidate.display()
                    );
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(DemuxError::ToolNotFound {
            tool: self.tool.clone(),
            searched,
        })
    }
}

/// Platform-specific MKVToolNix install directories.
fn default_install_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        ["ProgramFiles", "ProgramFiles(x86)"]
            .iter()
            .filter_map(|var| env::var_os(var))
            .map(|base| PathBuf::from(base).join("MKVToolNix"))
            .collect()
    } else if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/MKVToolNix.app/Contents/MacOS"),
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
        ]
    } else {
        vec![PathBuf::from("/usr/bin"), PathBuf::from("/usr/local/bin")]
    }
}
