//! Package manifest (`.nuspec`) reading.
//!
//! Dependency information is informational only: it feeds the README that
//! accompanies an archive and the registry fetcher's recursive resolution,
//! but never changes what gets archived.

mod nuspec;
mod reader;
mod report;

pub use nuspec::{parse_nuspec, DependencyDescriptor, Nuspec, NUSPEC_NAMESPACES};
pub use reader::{read_dependencies, read_package_manifest, DependencyListing, ManifestIndex};
pub use report::{render_report, write_report, REPORT_FILE_NAME};
