use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum WhaleError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WhaleError>;

/// Errors raised while parsing package identifiers from user input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid package identifier: '{id}'")]
    InvalidId { id: String },

    #[error("Missing version after '@' in '{input}'")]
    EmptyVersion { input: String },

    #[error("No package identifiers given")]
    Empty,
}

/// Errors from a single fetch attempt. Only `ToolNotFound` is fatal for the run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Package manager executable not found: {}", path.display())]
    ToolNotFound { path: PathBuf },

    #[error("Failed to start package manager: {0}")]
    ToolSpawn(std::io::Error),

    #[error("Package manager exited with {}: {stderr}", status.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    ToolFailed { status: Option<i32>, stderr: String },

    #[error("Package manager reported errors: {stderr}")]
    ToolStderr { stderr: String },

    #[error("Expected package folder was not created: {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("Failed to extract package: {0}")]
    Extract(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::ToolNotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// One package failed; the remaining packages are still processed.
    #[error("Failed to acquire {package}: {source}")]
    Package {
        package: String,
        #[source]
        source: FetchError,
    },

    #[error("Package manager executable not found: {}", path.display())]
    ToolNotFound { path: PathBuf },

    #[error("Could not create download folder {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No packages could be acquired ({} failed)", failures.len())]
    NothingAcquired { failures: Vec<AcquisitionError> },
}

impl AcquisitionError {
    /// Whether this error ends the whole run rather than a single package.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AcquisitionError::Package { .. })
    }

    /// The package identifier this failure belongs to, if any.
    pub fn package(&self) -> Option<&str> {
        match self {
            AcquisitionError::Package { package, .. } => Some(package),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Source directory not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid zip archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Path traversal detected in archive: {name}")]
    UnsafeEntry { name: String },
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Input file not found: {}", path.display())]
    InputMissing { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Base64 in {}: {source}", path.display())]
    InvalidBase64 {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("No .nuspec descriptor found in {}", folder.display())]
    DescriptorNotFound { folder: PathBuf },

    #[error("Found {count} .nuspec descriptors in {}, expected one", folder.display())]
    MultipleDescriptors { folder: PathBuf, count: usize },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open package {}: {source}", path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Malformed nuspec {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Missing <metadata> element in {}", path.display())]
    MissingMetadata { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid registry URL '{url}': {source}")]
    InvalidRegistryUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
