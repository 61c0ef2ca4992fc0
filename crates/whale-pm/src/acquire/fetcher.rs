use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AcquisitionError, FetchError};
use crate::package::PackageRequest;

/// A way of obtaining packages into a local folder.
///
/// Implementations leave each package's contents under
/// `destination/<id>/` and return that folder.
pub trait PackageFetcher {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Check for conditions that would make every fetch fail.
    fn preflight(&self) -> Result<(), AcquisitionError> {
        Ok(())
    }

    /// Acquire one package into `destination`.
    fn fetch(&self, request: &PackageRequest, destination: &Path) -> Result<PathBuf, FetchError>;
}

/// Find the folder for `id` under `destination`, ignoring case.
///
/// Package ids are case-insensitive and tools are free to use the
/// canonical casing from the package itself.
pub(crate) fn find_package_folder(destination: &Path, id: &str) -> Option<PathBuf> {
    let exact = destination.join(id);
    if exact.is_dir() {
        return Some(exact);
    }

    fs::read_dir(destination)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_package_folder_ignores_case() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("Newtonsoft.Json")).unwrap();

        let found = find_package_folder(temp.path(), "newtonsoft.json").unwrap();
        assert!(found.ends_with("Newtonsoft.Json"));
        assert!(find_package_folder(temp.path(), "Serilog").is_none());
    }
}
