pub mod acquire;
pub mod archive;
pub mod config;
pub mod error;
pub mod http;
pub mod manifest;
pub mod package;
pub mod scratch;
pub mod transcode;
pub mod workflow;

pub use error::{Result, WhaleError};
pub use acquire::{AcquireReport, Acquirer, NugetCliFetcher, PackageFetcher, PackageOutcome, RegistryFetcher};
pub use config::{Config, Strategy};
pub use manifest::{read_dependencies, DependencyDescriptor, DependencyListing, ManifestIndex};
pub use package::{parse_package_list, PackageRequest, VersionRange};
pub use scratch::ScratchDir;
pub use transcode::{decode_file, encode_file};
pub use workflow::{FolderArchive, RunSummary, Workflow};
