//! End-to-end operations: download and archive, archive a folder, encode, decode.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::acquire::{Acquirer, PackageOutcome};
use crate::archive::build_archive;
use crate::config::Config;
use crate::error::{AcquisitionError, RequestError, Result};
use crate::manifest::{read_dependencies, write_report};
use crate::package::PackageRequest;
use crate::scratch::ScratchDir;
use crate::transcode::{decode_file, encode_file};

const ENCODED_SUFFIX: &str = ".base64.txt";

/// What a completed download-and-archive run produced
#[derive(Debug)]
pub struct RunSummary {
    pub output_folder: PathBuf,
    pub encoded: PathBuf,
    /// The intermediate zip, when kept
    pub archive: Option<PathBuf>,
    /// The dependency report, when written
    pub readme: Option<PathBuf>,
    pub entry_count: usize,
    pub succeeded: Vec<PackageRequest>,
    pub failed: Vec<AcquisitionError>,
}

/// What archiving a local folder produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderArchive {
    pub encoded: PathBuf,
    pub archive: Option<PathBuf>,
    pub entry_count: usize,
}

pub struct Workflow {
    config: Config,
    acquirer: Acquirer,
}

impl Workflow {
    pub fn new(config: Config, acquirer: Acquirer) -> Self {
        Self { config, acquirer }
    }

    /// Build a workflow with the fetcher selected by `config.strategy`.
    pub fn from_config(config: Config) -> Result<Self> {
        let acquirer = Acquirer::from_config(&config)?;
        Ok(Self::new(config, acquirer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    /// Acquire `requests`, archive them, and leave a Base64 copy in a new
    /// timestamped folder under the output directory.
    ///
    /// The scratch directory is removed whatever the outcome.
    pub fn download_and_archive<F>(&self, requests: &[PackageRequest], on_outcome: F) -> Result<RunSummary>
    where
        F: FnMut(PackageOutcome<'_>),
    {
        if requests.is_empty() {
            return Err(RequestError::Empty.into());
        }

        let scratch = ScratchDir::create(self.config.scratch_dir.as_deref())?;
        let result = self.run_in(&scratch, requests, on_outcome);
        scratch.close();
        result
    }

    fn run_in<F>(&self, scratch: &ScratchDir, requests: &[PackageRequest], on_outcome: F) -> Result<RunSummary>
    where
        F: FnMut(PackageOutcome<'_>),
    {
        let packages = scratch.join("packages");
        let report = self.acquirer.acquire_all(requests, &packages, on_outcome)?;

        let manifests = if self.config.document_dependencies {
            match read_dependencies(&packages) {
                Ok(index) => Some(index),
                Err(err) => {
                    log::warn!("Skipping dependency report: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let folder = create_output_folder(&self.config.output_dir, report.succeeded.len())?;
        let name = folder_name(&folder);
        let archive = folder.join(format!("{}.zip", name));
        let encoded = folder.join(format!("{}{}", name, ENCODED_SUFFIX));

        let outputs = (|| -> Result<(usize, Option<PathBuf>)> {
            let built = build_archive(&packages, &archive)?;
            encode_file(&archive, &encoded)?;
            let readme = match &manifests {
                Some(index) => Some(write_report(index, &folder)?),
                None => None,
            };
            Ok((built.entry_count, readme))
        })();

        let (entry_count, readme) = match outputs {
            Ok(outputs) => outputs,
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&folder) {
                    log::warn!("Could not remove {}: {}", folder.display(), cleanup);
                }
                return Err(err);
            }
        };

        let archive = self.discard_archive_unless_kept(archive);
        log::info!("Run complete: {}", encoded.display());

        Ok(RunSummary {
            output_folder: folder,
            encoded,
            archive,
            readme,
            entry_count,
            succeeded: report.succeeded,
            failed: report.failed,
        })
    }

    /// Zip a local folder into the output directory and Base64-encode the zip.
    ///
    /// Partial outputs are removed if either step fails.
    pub fn archive_folder(&self, source: &Path) -> Result<FolderArchive> {
        let base = archive_base_name(source);
        let archive = self.config.output_dir.join(format!("{}.zip", base.to_string_lossy()));
        let encoded = self
            .config
            .output_dir
            .join(format!("{}{}", base.to_string_lossy(), ENCODED_SUFFIX));

        let built = build_archive(source, &archive)?;
        if let Err(err) = encode_file(&archive, &encoded) {
            remove_quietly(&archive);
            remove_quietly(&encoded);
            return Err(err.into());
        }

        Ok(FolderArchive {
            encoded,
            archive: self.discard_archive_unless_kept(archive),
            entry_count: built.entry_count,
        })
    }

    /// Decode a Base64 text file; defaults to `<stem>.zip` next to the input.
    pub fn decode(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let output = match output {
            Some(output) => output.to_path_buf(),
            None => default_decoded_path(input),
        };
        decode_file(input, &output)?;
        Ok(output)
    }

    /// Encode any file; defaults to `<input>.base64.txt`.
    pub fn encode(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let output = match output {
            Some(output) => output.to_path_buf(),
            None => default_encoded_path(input),
        };
        encode_file(input, &output)?;
        Ok(output)
    }

    fn discard_archive_unless_kept(&self, archive: PathBuf) -> Option<PathBuf> {
        if self.config.keep_zip {
            return Some(archive);
        }
        match fs::remove_file(&archive) {
            Ok(()) => None,
            Err(err) => {
                log::warn!("Could not remove intermediate {}: {}", archive.display(), err);
                Some(archive)
            }
        }
    }
}

/// Create `whale_puup_<count>_krills_at_<timestamp>` under `base`, adding
/// `_<k>` when that name is taken.
fn create_output_folder(base: &Path, count: usize) -> io::Result<PathBuf> {
    fs::create_dir_all(base)?;
    let name = format!(
        "whale_puup_{}_krills_at_{}",
        count,
        Local::now().format("%Y%m%d%H%M%S")
    );
    create_unique_dir(base, &name)
}

fn create_unique_dir(base: &Path, name: &str) -> io::Result<PathBuf> {
    let mut suffix = 0usize;
    loop {
        let candidate = if suffix == 0 {
            base.join(name)
        } else {
            base.join(format!("{}_{}", name, suffix))
        };

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(err) => return Err(err),
        }
    }
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name used for a folder's archive; `.` and `..` resolve to the real name.
fn archive_base_name(source: &Path) -> OsString {
    source
        .file_name()
        .map(OsString::from)
        .or_else(|| {
            source
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(OsString::from))
        })
        .unwrap_or_else(|| OsString::from("archive"))
}

fn default_decoded_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = match name.strip_suffix(ENCODED_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "decoded".to_string()),
    };

    let candidate = input.with_file_name(format!("{}.zip", stem));
    if candidate == input {
        input.with_file_name(format!("{}.decoded.zip", stem))
    } else {
        candidate
    }
}

fn default_encoded_path(input: &Path) -> PathBuf {
    let mut name = input.file_name().map(OsString::from).unwrap_or_default();
    name.push(ENCODED_SUFFIX);
    input.with_file_name(name)
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            log::warn!("Could not remove {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::PackageFetcher;
    use crate::archive::list_entries;
    use crate::error::{FetchError, WhaleError};
    use tempfile::TempDir;

    struct FolderFetcher;

    impl PackageFetcher for FolderFetcher {
        fn name(&self) -> &str {
            "folder"
        }

        fn fetch(&self, request: &PackageRequest, destination: &Path) -> std::result::Result<PathBuf, FetchError> {
            if request.id == "Missing.Pkg" {
                return Err(FetchError::ToolStderr { stderr: "Unable to find package".into() });
            }
            let folder = destination.join(&request.id);
            fs::create_dir_all(folder.join("lib"))?;
            fs::write(
                folder.join(format!("{}.nuspec", request.id)),
                format!("<package><metadata><id>{}</id></metadata></package>", request.id),
            )?;
            fs::write(folder.join("lib").join("a.dll"), [0u8, 1, 2])?;
            Ok(folder)
        }
    }

    fn workflow(temp: &TempDir, keep_zip: bool) -> Workflow {
        let mut config = Config::new();
        config.output_dir = temp.path().join("out");
        config.scratch_dir = Some(temp.path().join("scratch"));
        config.keep_zip = keep_zip;
        Workflow::new(config, Acquirer::with_fetcher(Box::new(FolderFetcher)))
    }

    fn scratch_is_empty(temp: &TempDir) -> bool {
        fs::read_dir(temp.path().join("scratch")).map_or(true, |mut d| d.next().is_none())
    }

    #[test]
    fn test_download_and_archive() {
        let temp = TempDir::new().unwrap();
        let workflow = workflow(&temp, true);
        let requests = vec![PackageRequest::new("Good.Pkg"), PackageRequest::new("Missing.Pkg")];

        let summary = workflow.download_and_archive(&requests, |_| {}).unwrap();

        let name = folder_name(&summary.output_folder);
        assert!(name.starts_with("whale_puup_1_krills_at_"));
        assert_eq!(summary.succeeded, vec![PackageRequest::new("Good.Pkg")]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.encoded.is_file());
        assert!(summary.readme.as_ref().is_some_and(|p| p.is_file()));

        let archive = summary.archive.unwrap();
        assert_eq!(
            list_entries(&archive).unwrap(),
            vec!["Good.Pkg/Good.Pkg.nuspec", "Good.Pkg/lib/a.dll"]
        );
        assert!(scratch_is_empty(&temp));
    }

    #[test]
    fn test_zip_removed_unless_kept() {
        let temp = TempDir::new().unwrap();
        let summary = workflow(&temp, false)
            .download_and_archive(&[PackageRequest::new("Good.Pkg")], |_| {})
            .unwrap();

        assert!(summary.archive.is_none());
        let files: Vec<String> = fs::read_dir(&summary.output_folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with(".zip")));
    }

    #[test]
    fn test_total_failure_cleans_scratch() {
        let temp = TempDir::new().unwrap();
        let err = workflow(&temp, false)
            .download_and_archive(&[PackageRequest::new("Missing.Pkg")], |_| {})
            .unwrap_err();

        assert!(matches!(
            err,
            WhaleError::Acquisition(AcquisitionError::NothingAcquired { .. })
        ));
        assert!(scratch_is_empty(&temp));
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_empty_request_list() {
        let temp = TempDir::new().unwrap();
        let err = workflow(&temp, false).download_and_archive(&[], |_| {}).unwrap_err();
        assert!(matches!(err, WhaleError::Request(RequestError::Empty)));
    }

    #[test]
    fn test_archive_folder_and_decode() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("mydata");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested").join("x.bin"), [9u8; 64]).unwrap();

        let workflow = workflow(&temp, false);
        let result = workflow.archive_folder(&source).unwrap();

        assert_eq!(result.encoded, temp.path().join("out").join("mydata.base64.txt"));
        assert_eq!(result.archive, None);
        assert_eq!(result.entry_count, 1);

        let decoded = workflow.decode(&result.encoded, None).unwrap();
        assert_eq!(decoded, temp.path().join("out").join("mydata.zip"));
        assert_eq!(list_entries(&decoded).unwrap(), vec!["nested/x.bin"]);
    }

    #[test]
    fn test_archive_missing_folder_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let err = workflow(&temp, false)
            .archive_folder(&temp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, WhaleError::Archive(_)));
        assert!(!temp.path().join("out").join("nope.zip").exists());
        assert!(!temp.path().join("out").join("nope.base64.txt").exists());
    }

    #[test]
    fn test_encode_default_output() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("tool.exe");
        fs::write(&input, b"MZ").unwrap();

        let output = workflow(&temp, false).encode(&input, None).unwrap();
        assert_eq!(output, temp.path().join("tool.exe.base64.txt"));
        assert_eq!(fs::read_to_string(output).unwrap(), "TVo=");
    }

    #[test]
    fn test_default_decoded_path() {
        assert_eq!(default_decoded_path(Path::new("a/pkg.base64.txt")), PathBuf::from("a/pkg.zip"));
        assert_eq!(default_decoded_path(Path::new("pkg.txt")), PathBuf::from("pkg.zip"));
        assert_eq!(default_decoded_path(Path::new("pkg.zip")), PathBuf::from("pkg.decoded.zip"));
    }

    #[test]
    fn test_unique_output_folder() {
        let temp = TempDir::new().unwrap();
        let first = create_unique_dir(temp.path(), "whale_puup_1_krills_at_20250101000000").unwrap();
        let second = create_unique_dir(temp.path(), "whale_puup_1_krills_at_20250101000000").unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("whale_puup_1_krills_at_20250101000000_1"));
    }

    #[test]
    fn test_archive_base_name_of_dot() {
        assert_ne!(archive_base_name(Path::new(".")), OsString::from(""));
        assert_eq!(archive_base_name(Path::new("/data/pkgs")), OsString::from("pkgs"));
    }
}
