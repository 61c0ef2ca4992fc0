//! Package identifiers and NuGet version ranges.

mod request;
mod version_range;

pub use request::{is_exit_command, parse_package_list, PackageRequest};
pub use version_range::{VersionBound, VersionRange};
