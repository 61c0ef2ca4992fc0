//! Directory-to-zip archiving.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// A freshly written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArchive {
    pub path: PathBuf,
    pub entry_count: usize,
}

/// Compress every regular file under `source` into a zip at `destination`.
///
/// Entries are stored relative to `source` with `/` separators, in sorted
/// order. If `destination` lies inside `source` it is never archived into
/// itself. A partially written archive is removed on failure.
pub fn build_archive(source: &Path, destination: &Path) -> Result<BuiltArchive, ArchiveError> {
    if !source.exists() {
        return Err(ArchiveError::SourceMissing { path: source.to_path_buf() });
    }
    if !source.is_dir() {
        return Err(ArchiveError::NotADirectory { path: source.to_path_buf() });
    }

    let source_root = source.canonicalize().map_err(|err| ArchiveError::Read {
        path: source.to_path_buf(),
        source: err,
    })?;

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| ArchiveError::Write {
            path: parent.to_path_buf(),
            source: err,
        })?;
    }

    let file = File::create(destination).map_err(|err| ArchiveError::Write {
        path: destination.to_path_buf(),
        source: err,
    })?;

    // Resolve only after creation so symlinked parents compare equal to walked paths
    let destination_canonical = destination
        .canonicalize()
        .unwrap_or_else(|_| destination.to_path_buf());

    match write_entries(&source_root, file, destination, &destination_canonical) {
        Ok(entry_count) => {
            log::info!(
                "Archived {} files from {} into {}",
                entry_count,
                source.display(),
                destination.display()
            );
            Ok(BuiltArchive { path: destination.to_path_buf(), entry_count })
        }
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(destination) {
                log::warn!(
                    "Could not remove partial archive {}: {}",
                    destination.display(),
                    cleanup
                );
            }
            Err(err)
        }
    }
}

fn write_entries(
    source_root: &Path,
    file: File,
    destination: &Path,
    destination_canonical: &Path,
) -> Result<usize, ArchiveError> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut entry_count = 0;

    for entry in WalkDir::new(source_root).sort_by_file_name() {
        let entry = entry.map_err(|err| ArchiveError::Walk {
            root: source_root.to_path_buf(),
            source: err,
        })?;

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                log::debug!("Skipping symlink {}", entry.path().display());
            }
            continue;
        }

        let path = entry.path();
        if path == destination_canonical {
            log::debug!("Skipping the archive itself: {}", path.display());
            continue;
        }

        let name = entry_name(source_root, path);
        let metadata = entry.metadata().map_err(|err| ArchiveError::Walk {
            root: source_root.to_path_buf(),
            source: err,
        })?;

        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= u32::MAX as u64);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode());
        }

        zip.start_file(name.as_str(), options)
            .map_err(|err| ArchiveError::Zip { path: destination.to_path_buf(), source: err })?;

        let input = File::open(path).map_err(|err| ArchiveError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
        std::io::copy(&mut BufReader::new(input), &mut zip).map_err(|err| ArchiveError::Write {
            path: destination.to_path_buf(),
            source: err,
        })?;

        log::trace!("Added {}", name);
        entry_count += 1;
    }

    zip.finish()
        .map_err(|err| ArchiveError::Zip { path: destination.to_path_buf(), source: err })?;

    Ok(entry_count)
}

/// Relative path of `path` under `root`, `/`-separated
fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorted names of the file entries in a zip archive
pub fn list_entries(archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = File::open(archive).map_err(|err| ArchiveError::Read {
        path: archive.to_path_buf(),
        source: err,
    })?;
    let zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|err| ArchiveError::Zip { path: archive.to_path_buf(), source: err })?;

    let mut names: Vec<String> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}
