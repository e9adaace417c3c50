//! Per-folder scratch directory for extracted streams.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "vidupe-";

/// A temporary directory that lives for one folder job.
///
/// The directory and everything in it are removed on drop, whichever way the
/// job ends.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, or the system temp dir.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path of the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory could not be removed.
    pub fn close(self) -> io::Result<()> {
        let path: PathBuf = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_workspace_under_root() {
        let root = tempfile::TempDir::new().unwrap();
        let ws = Workspace::create(Some(root.path())).unwrap();
        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));
        assert!(ws.path().is_dir());
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = tempfile::TempDir::new().unwrap();
        let path = {
            let ws = Workspace::create(Some(root.path())).unwrap();
            fs::write(ws.path().join("stream.h264"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_close() {
        let ws = Workspace::create(None).unwrap();
        let path = ws.path().to_path_buf();
        ws.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_missing_root() {
        let root = tempfile::TempDir::new().unwrap();
        assert!(Workspace::create(Some(&root.path().join("missing"))).is_err());
    }
}
