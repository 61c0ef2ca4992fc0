//! Package acquisition.
//!
//! Packages are obtained one at a time by a [`PackageFetcher`], either the
//! `nuget` command line tool or a direct registry download. The
//! [`Acquirer`] isolates per-package failures and stops only on
//! conditions that doom the whole run.

mod fetcher;
mod manager;
mod nuget_cli;
mod registry;

pub use fetcher::PackageFetcher;
pub use manager::{AcquireReport, Acquirer, PackageOutcome};
pub use nuget_cli::NugetCliFetcher;
pub use registry::RegistryFetcher;
