use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use super::nuspec::{parse_nuspec, DependencyDescriptor, Nuspec};
use crate::error::ManifestError;

/// Per-package dependency information, keyed by package folder name in sorted order.
pub type ManifestIndex = IndexMap<String, DependencyListing>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyListing {
    /// Dependencies read from the descriptor; may be empty
    Parsed(Vec<DependencyDescriptor>),
    /// The descriptor could not be located or parsed
    Unreadable(String),
}

impl DependencyListing {
    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        match self {
            DependencyListing::Parsed(deps) => deps,
            DependencyListing::Unreadable(_) => &[],
        }
    }
}

/// Read the dependency list of every package folder directly under `dir`.
///
/// A package whose descriptor is missing or malformed is recorded as
/// [`DependencyListing::Unreadable`]; it never aborts the scan.
pub fn read_dependencies(dir: &Path) -> Result<ManifestIndex, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::NotADirectory { path: dir.to_path_buf() });
    }

    let mut folders: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| ManifestError::Read { path: dir.to_path_buf(), source })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    let mut index = ManifestIndex::new();
    for folder in folders {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let listing = match read_package_manifest(&folder) {
            Ok(nuspec) => DependencyListing::Parsed(nuspec.dependencies),
            Err(err) => {
                log::warn!("Could not read dependencies of {}: {}", name, err);
                DependencyListing::Unreadable(err.to_string())
            }
        };
        index.insert(name, listing);
    }

    Ok(index)
}

/// Locate and parse the descriptor of one package folder.
///
/// Prefers a single `.nuspec` at the top of the folder, then falls back to
/// the descriptor inside a single `.nupkg`.
pub fn read_package_manifest(folder: &Path) -> Result<Nuspec, ManifestError> {
    let nuspecs = files_with_extension(folder, "nuspec")?;
    match nuspecs.as_slice() {
        [path] => {
            let text = fs::read_to_string(path)
                .map_err(|source| ManifestError::Read { path: path.clone(), source })?;
            parse_nuspec(&text, path)
        }
        [] => {
            let packages = files_with_extension(folder, "nupkg")?;
            match packages.as_slice() {
                [package] => read_packed_nuspec(package),
                _ => Err(ManifestError::DescriptorNotFound { folder: folder.to_path_buf() }),
            }
        }
        many => Err(ManifestError::MultipleDescriptors {
            folder: folder.to_path_buf(),
            count: many.len(),
        }),
    }
}

fn read_packed_nuspec(package: &Path) -> Result<Nuspec, ManifestError> {
    let file = File::open(package)
        .map_err(|source| ManifestError::Read { path: package.to_path_buf(), source })?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|source| ManifestError::Package { path: package.to_path_buf(), source })?;

    let entries: Vec<String> = zip
        .file_names()
        .filter(|name| !name.contains('/') && has_extension(Path::new(name), "nuspec"))
        .map(str::to_string)
        .collect();

    let [entry] = entries.as_slice() else {
        return Err(ManifestError::DescriptorNotFound { folder: package.to_path_buf() });
    };

    let mut text = String::new();
    zip.by_name(entry)
        .map_err(|source| ManifestError::Package { path: package.to_path_buf(), source })?
        .read_to_string(&mut text)
        .map_err(|source| ManifestError::Read { path: package.to_path_buf(), source })?;

    parse_nuspec(&text, &package.join(entry))
}

fn files_with_extension(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, ManifestError> {
    let mut files: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|source| ManifestError::Read { path: folder.to_path_buf(), source })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extension))
        .collect();
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
