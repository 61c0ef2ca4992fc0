use std::fs;
use std::path::{Path, PathBuf};

use super::fetcher::PackageFetcher;
use super::nuget_cli::NugetCliFetcher;
use super::registry::RegistryFetcher;
use crate::config::{Config, Strategy};
use crate::error::{AcquisitionError, FetchError, WhaleError};
use crate::package::PackageRequest;

/// Result of handling one requested package
#[derive(Debug)]
pub enum PackageOutcome<'a> {
    Acquired { request: &'a PackageRequest, folder: &'a Path },
    Failed { request: &'a PackageRequest, error: &'a AcquisitionError },
}

/// What a (partially) successful acquisition produced
#[derive(Debug)]
pub struct AcquireReport {
    pub destination: PathBuf,
    /// Requests that were acquired, in request order
    pub succeeded: Vec<PackageRequest>,
    /// One `AcquisitionError::Package` per failed request
    pub failed: Vec<AcquisitionError>,
}

impl AcquireReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives a [`PackageFetcher`] over a list of requests, isolating failures per package.
pub struct Acquirer {
    fetcher: Box<dyn PackageFetcher>,
}

impl Acquirer {
    pub fn with_fetcher(fetcher: Box<dyn PackageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Pick the fetcher named by `config.strategy`.
    pub fn from_config(config: &Config) -> Result<Self, WhaleError> {
        let fetcher: Box<dyn PackageFetcher> = match config.strategy {
            Strategy::Http => Box::new(RegistryFetcher::from_config(config)?),
            Strategy::NugetCli => Box::new(NugetCliFetcher::from_config(config)),
        };
        Ok(Self::with_fetcher(fetcher))
    }

    pub fn strategy_name(&self) -> &str {
        self.fetcher.name()
    }

    /// Acquire every request into `destination`.
    ///
    /// A failing package does not stop the others; `on_outcome` is told
    /// about each one as it completes. Errors are returned only when the
    /// run cannot continue at all or when nothing was acquired, in which
    /// case `destination` is removed.
    pub fn acquire_all<F>(
        &self,
        requests: &[PackageRequest],
        destination: &Path,
        mut on_outcome: F,
    ) -> Result<AcquireReport, AcquisitionError>
    where
        F: FnMut(PackageOutcome<'_>),
    {
        self.fetcher.preflight()?;

        fs::create_dir_all(destination).map_err(|source| AcquisitionError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

        log::info!(
            "Acquiring {} package(s) via {} into {}",
            requests.len(),
            self.fetcher.name(),
            destination.display()
        );

        let mut report = AcquireReport {
            destination: destination.to_path_buf(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        for request in requests {
            match self.fetcher.fetch(request, destination) {
                Ok(folder) => {
                    on_outcome(PackageOutcome::Acquired { request, folder: &folder });
                    report.succeeded.push(request.clone());
                }
                Err(err) if err.is_fatal() => {
                    log::error!("Aborting acquisition at {}: {}", request, err);
                    return Err(match err {
                        FetchError::ToolNotFound { path } => {
                            AcquisitionError::ToolNotFound { path }
                        }
                        source => AcquisitionError::Package { package: request.to_string(), source },
                    });
                }
                Err(source) => {
                    log::warn!("Failed to acquire {}: {}", request, source);
                    let error = AcquisitionError::Package { package: request.to_string(), source };
                    on_outcome(PackageOutcome::Failed { request, error: &error });
                    report.failed.push(error);
                }
            }
        }

        if report.succeeded.is_empty() {
            if let Err(err) = fs::remove_dir_all(destination) {
                log::warn!("Could not remove {}: {}", destination.display(), err);
            }
            return Err(AcquisitionError::NothingAcquired { failures: report.failed });
        }

        log::info!(
            "Acquired {} of {} package(s)",
            report.succeeded.len(),
            requests.len()
        );
        Ok(report)
    }
}
