//! Zip extraction with path traversal protection.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

/// Extract every entry of a zip archive into `dest_dir`, keeping relative paths.
///
/// Returns the number of files written. Entries whose names would resolve
/// outside `dest_dir` abort the extraction.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(archive_path).map_err(|source| ArchiveError::Read {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    })?;

    std::fs::create_dir_all(dest_dir).map_err(|source| write_error(dest_dir, source))?;

    // Canonicalize dest_dir for path traversal check
    let dest_dir_canonical = dest_dir
        .canonicalize()
        .map_err(|source| write_error(dest_dir, source))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ArchiveError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;

        let name = entry.name().to_string();
        let relative_path = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry { name: name.clone() })?;

        if relative_path.as_os_str().is_empty() {
            continue;
        }

        let outpath = dest_dir.join(&relative_path);

        // Create parent dirs first so we can canonicalize
        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|source| write_error(&outpath, source))?;
        } else if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|source| write_error(parent, source))?;
        }

        if !canonical_target(&outpath).starts_with(&dest_dir_canonical) {
            return Err(ArchiveError::UnsafeEntry { name });
        }

        if entry.is_dir() {
            continue;
        }

        let mut outfile = File::create(&outpath).map_err(|source| write_error(&outpath, source))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|source| write_error(&outpath, source))?;
        written += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                // Never drop our own read/write access to extracted files
                let mode = (mode & 0o777) | 0o600;
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .map_err(|source| write_error(&outpath, source))?;
            }
        }
    }

    log::debug!(
        "Extracted {} files from {} into {}",
        written,
        archive_path.display(),
        dest_dir.display()
    );
    Ok(written)
}

/// Canonical form of a path that may not exist yet (its parent does)
fn canonical_target(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if let (Some(parent), Some(filename)) = (path.parent(), path.file_name()) {
            if let Ok(parent_canonical) = parent.canonicalize() {
                return parent_canonical.join(filename);
            }
        }
        path.to_path_buf()
    })
}

fn write_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Write { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_keeps_layout() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("Good.Pkg.nupkg");
        write_zip(
            &archive,
            &[
                ("Good.Pkg.nuspec", b"<package/>"),
                ("lib/", b""),
                ("lib/net6.0/Good.Pkg.dll", &[0x4d, 0x5a, 0x90, 0x00]),
                ("[Content_Types].xml", b"<Types/>"),
            ],
        );

        let dest = temp.path().join("out");
        let written = extract_archive(&archive, &dest).unwrap();

        assert_eq!(written, 3);
        assert!(dest.join("Good.Pkg.nuspec").is_file());
        assert!(dest.join("[Content_Types].xml").is_file());
        assert_eq!(
            std::fs::read(dest.join("lib/net6.0/Good.Pkg.dll")).unwrap(),
            vec![0x4d, 0x5a, 0x90, 0x00]
        );
    }

    #[test]
    fn test_extract_does_not_strip_single_root_folder() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("only-lib.zip");
        write_zip(&archive, &[("lib/a.dll", b"a"), ("lib/b.dll", b"b")]);

        let dest = temp.path().join("out");
        extract_archive(&archive, &dest).unwrap();
        assert!(dest.join("lib/a.dll").is_file());
        assert!(dest.join("lib/b.dll").is_file());
    }

    #[test]
    fn test_extract_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", b"gotcha")]);

        let dest = temp.path().join("out");
        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsafeEntry { .. }));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fake.nupkg");
        std::fs::write(&archive, b"<html>Not Found</html>").unwrap();

        let err = extract_archive(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ArchiveError::Zip { .. }));
    }

    #[test]
    fn test_extract_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = extract_archive(&temp.path().join("nope.zip"), temp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Read { .. }));
    }
}
