//! Acquisition by direct download from a NuGet v2 package endpoint.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use super::fetcher::{find_package_folder, PackageFetcher};
use crate::archive::extract_archive;
use crate::config::Config;
use crate::error::{ConfigError, FetchError, WhaleError};
use crate::http::{HttpClient, HttpClientConfig};
use crate::manifest::read_package_manifest;
use crate::package::{PackageRequest, VersionRange};

const STAGING_PREFIX: &str = ".whale_staging_";

/// Downloads `.nupkg` files from `<base>/<id>[/<version>]` and unpacks them.
pub struct RegistryFetcher {
    client: HttpClient,
    base: Url,
    recursive: bool,
}

impl RegistryFetcher {
    pub fn new(client: HttpClient, base: Url) -> Result<Self, ConfigError> {
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "registry-url".to_string(),
                value: base.to_string(),
            });
        }
        Ok(Self { client, base, recursive: true })
    }

    pub fn from_config(config: &Config) -> Result<Self, WhaleError> {
        let mut http = HttpClientConfig::new().with_user_agent(config.user_agent.clone());
        if let Some(timeout) = config.http_timeout() {
            http = http.with_timeout(timeout);
        }
        let client = HttpClient::with_config(http).map_err(crate::http::HttpError::from)?;

        Ok(Self::new(client, config.registry_base()?)?.with_recursive(config.recursive))
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Download URL for a package, with the id and version percent-escaped as path segments
    pub fn package_url(&self, id: &str, version: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
            if let Some(version) = version {
                segments.push(version);
            }
        }
        url
    }

    /// Download and unpack one package into `destination/<id>/`.
    ///
    /// Work happens in a staging folder beside the target, which is only
    /// moved into place once extraction succeeds. A failed attempt leaves any
    /// folder already present for `id` untouched.
    fn download_package(
        &self,
        id: &str,
        version: Option<&str>,
        destination: &Path,
    ) -> Result<PathBuf, FetchError> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(destination)?;
        let nupkg = staging.path().join(format!("{}.nupkg", id));
        let url = self.package_url(id, version);

        let bytes = self.client.download(url.as_str(), &nupkg, None::<fn(u64, u64)>)?;
        log::debug!("Downloaded {} ({} bytes)", id, bytes);
        let files = extract_archive(&nupkg, staging.path())?;

        if let Some(existing) = find_package_folder(destination, id) {
            log::debug!("Replacing {}", existing.display());
            fs::remove_dir_all(&existing)?;
        }
        let folder = destination.join(id);
        fs::rename(staging.path(), &folder)?;

        log::info!("Fetched {} ({} files)", id, files);
        Ok(folder)
    }

    /// Breadth-first download of everything `root` depends on.
    ///
    /// Dependencies are best effort: failures are logged and skipped.
    fn fetch_dependencies(&self, root: &Path, root_key: String, destination: &Path) {
        let mut visited = HashSet::from([root_key]);
        let mut queue = VecDeque::from([root.to_path_buf()]);

        while let Some(folder) = queue.pop_front() {
            let nuspec = match read_package_manifest(&folder) {
                Ok(nuspec) => nuspec,
                Err(err) => {
                    log::warn!("Cannot resolve dependencies of {}: {}", folder.display(), err);
                    continue;
                }
            };

            for dependency in nuspec.dependencies {
                if !visited.insert(dependency.id.to_lowercase()) {
                    continue;
                }

                let request = match dependency.id.parse::<PackageRequest>() {
                    Ok(request) => request,
                    Err(err) => {
                        log::warn!("Skipping dependency: {}", err);
                        continue;
                    }
                };
                if find_package_folder(destination, &request.id).is_some() {
                    log::debug!("Dependency {} already present", request.id);
                    continue;
                }

                let version = dependency
                    .version
                    .as_deref()
                    .and_then(VersionRange::parse)
                    .and_then(|range| range.lowest_applicable().map(str::to_string));

                match self.download_package(&request.id, version.as_deref(), destination) {
                    Ok(fetched) => queue.push_back(fetched),
                    Err(err) => log::warn!("Skipping dependency {}: {}", dependency, err),
                }
            }
        }
    }
}

impl PackageFetcher for RegistryFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, request: &PackageRequest, destination: &Path) -> Result<PathBuf, FetchError> {
        let folder = self.download_package(&request.id, request.version.as_deref(), destination)?;
        if self.recursive {
            self.fetch_dependencies(&folder, request.key(), destination);
        }
        Ok(folder)
    }
}
