//! Per-run scratch directories.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const PREFIX: &str = "whale_puup_";

/// A uniquely named temporary directory owned by one run.
///
/// Call [`ScratchDir::close`] at the end of the run to remove it and log a
/// warning if that fails. Dropping it also removes it, silently.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under `base`, or under the system temp directory.
    pub fn create(base: Option<&Path>) -> io::Result<Self> {
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => temp_dir_base(),
        };
        std::fs::create_dir_all(&base)?;

        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(&base)?;
        log::debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a child of the scratch directory
    pub fn join(&self, child: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(child)
    }

    /// Remove the directory. Failure is reported as a warning, never an error.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::debug!("Removed scratch directory {}", path.display()),
            Err(err) => log::warn!("Could not remove scratch directory {}: {}", path.display(), err),
        }
    }
}

/// System temp directory, never relative to the working directory.
fn temp_dir_base() -> PathBuf {
    let temp = env::temp_dir();
    if temp.is_absolute() {
        return temp;
    }

    #[cfg(windows)]
    {
        env::var("TEMP")
            .or_else(|_| env::var("TMP"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/tmp")
    }
}
