//! Acquisition through the `nuget` command line tool.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::fetcher::{find_package_folder, PackageFetcher};
use crate::config::Config;
use crate::error::{AcquisitionError, FetchError};
use crate::package::PackageRequest;

/// Runs `nuget install` once per package.
///
/// Packages land in `destination/<Id>/` thanks to `-ExcludeVersion`; the
/// tool also resolves dependencies unless recursion is turned off.
#[derive(Debug, Clone)]
pub struct NugetCliFetcher {
    executable: PathBuf,
    source: Option<String>,
    recursive: bool,
}

impl NugetCliFetcher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            source: None,
            recursive: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            executable: config.nuget_path.clone(),
            source: config.source.clone(),
            recursive: config.recursive,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn arguments(&self, request: &PackageRequest, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["install".into(), request.id.clone().into()];

        if let Some(version) = &request.version {
            args.push("-Version".into());
            args.push(version.into());
        }

        args.push("-OutputDirectory".into());
        args.push(destination.as_os_str().to_owned());
        args.push("-ExcludeVersion".into());
        args.push("-NonInteractive".into());

        if let Some(source) = &self.source {
            args.push("-Source".into());
            args.push(source.into());
        }

        if !self.recursive {
            args.push("-DependencyVersion".into());
            args.push("Ignore".into());
        }

        args
    }

    /// Locate the executable: a path is checked directly, a bare name is searched on `PATH`.
    fn resolve_executable(&self) -> Option<PathBuf> {
        if self.executable.components().count() > 1 || self.executable.is_absolute() {
            return self.executable.is_file().then(|| self.executable.clone());
        }

        let path = env::var_os("PATH")?;
        env::split_paths(&path).find_map(|dir| {
            candidate_names(&self.executable)
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }
}

fn candidate_names(executable: &Path) -> Vec<PathBuf> {
    let mut names = vec![executable.to_path_buf()];
    if cfg!(windows) && executable.extension().is_none() {
        names.push(executable.with_extension("exe"));
    }
    names
}

impl PackageFetcher for NugetCliFetcher {
    fn name(&self) -> &str {
        "nuget-cli"
    }

    fn preflight(&self) -> Result<(), AcquisitionError> {
        match self.resolve_executable() {
            Some(path) => {
                log::debug!("Using package manager at {}", path.display());
                Ok(())
            }
            None => Err(AcquisitionError::ToolNotFound { path: self.executable.clone() }),
        }
    }

    fn fetch(&self, request: &PackageRequest, destination: &Path) -> Result<PathBuf, FetchError> {
        let args = self.arguments(request, destination);
        log::debug!("Running {} {:?}", self.executable.display(), args);

        let output = Command::new(&self.executable).args(&args).output().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                FetchError::ToolNotFound { path: self.executable.clone() }
            } else {
                FetchError::ToolSpawn(err)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            log::trace!("nuget: {}", line);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(FetchError::ToolFailed { status: output.status.code(), stderr });
        }
        // nuget reports some failures (unknown package, bad source) on stderr with status 0
        if !stderr.is_empty() {
            return Err(FetchError::ToolStderr { stderr });
        }

        find_package_folder(destination, &request.id)
            .ok_or_else(|| FetchError::MissingOutput { path: destination.join(&request.id) })
    }
}
