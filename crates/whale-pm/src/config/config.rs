use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::source::{ConfigLoader, ConfigSource, RawConfig};
use crate::error::ConfigError;

pub const DEFAULT_REGISTRY_URL: &str = "https://www.nuget.org/api/v2/package/";

const DEFAULT_USER_AGENT: &str = concat!("whale-puup/", env!("CARGO_PKG_VERSION"));

/// How packages are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Direct HTTP download from the registry
    Http,
    /// Delegate to the nuget executable
    NugetCli,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Http
    }
}

impl Strategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Strategy::Http),
            "nuget-cli" | "nuget" => Some(Strategy::NugetCli),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Http => "http",
            Strategy::NugetCli => "nuget-cli",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective configuration for a run
#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: Strategy,
    /// Path or command name of the nuget executable
    pub nuget_path: PathBuf,
    pub registry_url: String,
    /// Package source passed to nuget (`-Source`)
    pub source: Option<String>,
    /// Also acquire declared dependencies
    pub recursive: bool,
    pub output_dir: PathBuf,
    /// Base directory for scratch folders; system temp when unset
    pub scratch_dir: Option<PathBuf>,
    /// Keep the intermediate zip next to the Base64 file
    pub keep_zip: bool,
    /// Write readme_puup_file.txt listing dependencies
    pub document_dependencies: bool,
    /// HTTP timeout in seconds; no timeout when unset
    pub http_timeout: Option<u64>,
    pub user_agent: String,

    sources: HashMap<String, ConfigSource>,
}

fn default_nuget_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("nuget.exe")
    } else {
        PathBuf::from("nuget")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strategy: Strategy::default(),
            nuget_path: default_nuget_path(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            source: None,
            recursive: true,
            output_dir: PathBuf::from("."),
            scratch_dir: None,
            keep_zip: false,
            document_dependencies: true,
            http_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: HashMap::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build configuration from defaults, global file, project file and environment.
    ///
    /// `config_file` overrides the upward search from `project_dir`; unlike the
    /// searched file it must exist.
    pub fn build(
        project_dir: Option<&Path>,
        config_file: Option<&Path>,
        use_environment: bool,
    ) -> Result<Self, ConfigError> {
        Self::build_with(&ConfigLoader::new(use_environment), project_dir, config_file)
    }

    /// Like [`Config::build`], reading files and environment through `loader`.
    pub fn build_with(
        loader: &ConfigLoader,
        project_dir: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for key in Self::config_keys() {
            config.sources.insert(key.to_string(), ConfigSource::Default);
        }

        // 1. Global whale.toml
        let global = loader.load_global_config()?;
        config.merge_raw_config(global, ConfigSource::Global)?;

        // 2. Project whale.toml
        let project_file = match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Read {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                    });
                }
                Some(path.to_path_buf())
            }
            None => project_dir.and_then(|dir| loader.find_project_config(dir)),
        };
        if let Some(path) = project_file {
            log::debug!("Loading project config from {}", path.display());
            let raw = loader.load_config_file(&path)?;
            config.merge_raw_config(raw, ConfigSource::Project(path))?;
        }

        // 3. Environment
        if loader.use_environment() {
            config.apply_env_overrides(loader)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the source of a configuration value
    pub fn get_source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Record that a value was set from the command line
    pub fn mark_command(&mut self, key: &str) {
        self.sources.insert(key.to_string(), ConfigSource::Command);
    }

    /// Expand `~` in paths and check the registry URL.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.nuget_path = expand_path(&self.nuget_path);
        self.output_dir = expand_path(&self.output_dir);
        self.scratch_dir = self.scratch_dir.as_deref().map(expand_path);
        self.registry_base()?;
        Ok(())
    }

    /// Registry base URL, normalized to end with a slash so ids can be appended
    pub fn registry_base(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.registry_url).map_err(|source| {
            ConfigError::InvalidRegistryUrl { url: self.registry_url.clone(), source }
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "registry-url".to_string(),
                value: self.registry_url.clone(),
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout.map(Duration::from_secs)
    }

    fn merge_raw_config(&mut self, raw: RawConfig, source: ConfigSource) -> Result<(), ConfigError> {
        if let Some(strategy) = raw.strategy {
            self.strategy = Strategy::from_str(&strategy).ok_or_else(|| ConfigError::InvalidValue {
                key: "strategy".to_string(),
                value: strategy.clone(),
            })?;
            self.sources.insert("strategy".to_string(), source.clone());
        }
        if let Some(nuget_path) = raw.nuget_path {
            self.nuget_path = nuget_path;
            self.sources.insert("nuget-path".to_string(), source.clone());
        }
        if let Some(registry_url) = raw.registry_url {
            self.registry_url = registry_url;
            self.sources.insert("registry-url".to_string(), source.clone());
        }
        if let Some(nuget_source) = raw.source {
            self.source = Some(nuget_source);
            self.sources.insert("source".to_string(), source.clone());
        }
        if let Some(recursive) = raw.recursive {
            self.recursive = recursive;
            self.sources.insert("recursive".to_string(), source.clone());
        }
        if let Some(output_dir) = raw.output_dir {
            self.output_dir = output_dir;
            self.sources.insert("output-dir".to_string(), source.clone());
        }
        if let Some(scratch_dir) = raw.scratch_dir {
            self.scratch_dir = Some(scratch_dir);
            self.sources.insert("scratch-dir".to_string(), source.clone());
        }
        if let Some(keep_zip) = raw.keep_zip {
            self.keep_zip = keep_zip;
            self.sources.insert("keep-zip".to_string(), source.clone());
        }
        if let Some(document) = raw.document_dependencies {
            self.document_dependencies = document;
            self.sources.insert("document-dependencies".to_string(), source.clone());
        }
        if let Some(timeout) = raw.http_timeout {
            self.http_timeout = Some(timeout);
            self.sources.insert("http-timeout".to_string(), source.clone());
        }
        if let Some(user_agent) = raw.user_agent {
            self.user_agent = user_agent;
            self.sources.insert("user-agent".to_string(), source);
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self, loader: &ConfigLoader) -> Result<(), ConfigError> {
        let env_source = |key: &str| ConfigSource::Environment(ConfigLoader::env_var_name(key));

        if let Some(strategy) = loader.get_env_config("strategy") {
            self.strategy = Strategy::from_str(&strategy).ok_or_else(|| ConfigError::InvalidValue {
                key: ConfigLoader::env_var_name("strategy"),
                value: strategy.clone(),
            })?;
            self.sources.insert("strategy".to_string(), env_source("strategy"));
        }
        if let Some(path) = loader.get_env_path("nuget-path") {
            self.nuget_path = path;
            self.sources.insert("nuget-path".to_string(), env_source("nuget-path"));
        }
        if let Some(url) = loader.get_env_config("registry-url") {
            self.registry_url = url;
            self.sources.insert("registry-url".to_string(), env_source("registry-url"));
        }
        if let Some(nuget_source) = loader.get_env_config("source") {
            self.source = Some(nuget_source);
            self.sources.insert("source".to_string(), env_source("source"));
        }
        if let Some(recursive) = loader.get_env_bool("recursive") {
            self.recursive = recursive;
            self.sources.insert("recursive".to_string(), env_source("recursive"));
        }
        if let Some(output_dir) = loader.get_env_path("output-dir") {
            self.output_dir = output_dir;
            self.sources.insert("output-dir".to_string(), env_source("output-dir"));
        }
        if let Some(scratch_dir) = loader.get_env_path("scratch-dir") {
            self.scratch_dir = Some(scratch_dir);
            self.sources.insert("scratch-dir".to_string(), env_source("scratch-dir"));
        }
        if let Some(keep_zip) = loader.get_env_bool("keep-zip") {
            self.keep_zip = keep_zip;
            self.sources.insert("keep-zip".to_string(), env_source("keep-zip"));
        }
        if let Some(document) = loader.get_env_bool("document-dependencies") {
            self.document_dependencies = document;
            self.sources
                .insert("document-dependencies".to_string(), env_source("document-dependencies"));
        }
        if let Some(timeout) = loader.get_env_u64("http-timeout")? {
            self.http_timeout = Some(timeout);
            self.sources.insert("http-timeout".to_string(), env_source("http-timeout"));
        }
        if let Some(user_agent) = loader.get_env_config("user-agent") {
            self.user_agent = user_agent;
            self.sources.insert("user-agent".to_string(), env_source("user-agent"));
        }
        Ok(())
    }

    fn config_keys() -> &'static [&'static str] {
        &[
            "strategy",
            "nuget-path",
            "registry-url",
            "source",
            "recursive",
            "output-dir",
            "scratch-dir",
            "keep-zip",
            "document-dependencies",
            "http-timeout",
            "user-agent",
        ]
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&text).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A loader that ignores the environment and the user's real global config
    fn isolated_loader(home: &TempDir) -> ConfigLoader {
        ConfigLoader::new(false).with_config_home(home.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.strategy, Strategy::Http);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert!(config.recursive);
        assert!(!config.keep_zip);
        assert!(config.document_dependencies);
        assert_eq!(config.http_timeout(), None);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(Strategy::from_str("http"), Some(Strategy::Http));
        assert_eq!(Strategy::from_str("NUGET-CLI"), Some(Strategy::NugetCli));
        assert_eq!(Strategy::from_str("nuget"), Some(Strategy::NugetCli));
        assert_eq!(Strategy::from_str("ftp"), None);
    }

    #[test]
    fn test_registry_base_gets_trailing_slash() {
        let mut config = Config::default();
        config.registry_url = "http://localhost:8080/api/v2/package".to_string();
        assert_eq!(
            config.registry_base().unwrap().as_str(),
            "http://localhost:8080/api/v2/package/"
        );
    }

    #[test]
    fn test_invalid_registry_url() {
        let mut config = Config::default();
        config.registry_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRegistryUrl { .. })));

        config.registry_url = "mailto:whale@example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_build_from_project_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("whale.toml"),
            "strategy = \"nuget-cli\"\nrecursive = false\nhttp-timeout = 45\n",
        )
        .unwrap();

        let home = TempDir::new().unwrap();
        let loader = isolated_loader(&home);
        let config = Config::build_with(&loader, Some(temp.path()), None).unwrap();
        assert_eq!(config.strategy, Strategy::NugetCli);
        assert!(!config.recursive);
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(45)));
        assert!(matches!(config.get_source("strategy"), Some(ConfigSource::Project(_))));
        assert_eq!(config.get_source("keep-zip"), Some(&ConfigSource::Default));
    }

    #[test]
    fn test_build_rejects_bad_strategy() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("custom.toml");
        fs::write(&file, "strategy = \"carrier-pigeon\"\n").unwrap();

        let err = Config::build_with(&isolated_loader(&temp), None, Some(&file)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "strategy"));
    }

    #[test]
    fn test_global_file_from_config_home() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("whale.toml"),
            "keep-zip = true\nuser-agent = \"mirror-bot/1\"\n",
        )
        .unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("whale.toml"), "keep-zip = false\n").unwrap();

        let config = Config::build_with(&isolated_loader(&home), Some(project.path()), None).unwrap();
        assert!(!config.keep_zip);
        assert!(matches!(config.get_source("keep-zip"), Some(ConfigSource::Project(_))));
        assert_eq!(config.user_agent, "mirror-bot/1");
        assert_eq!(config.get_source("user-agent"), Some(&ConfigSource::Global));
    }

    #[test]
    fn test_build_with_missing_explicit_file() {
        let home = TempDir::new().unwrap();
        let err = Config::build_with(&isolated_loader(&home), None, Some(Path::new("/nope/whale.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_mark_command() {
        let mut config = Config::default();
        config.keep_zip = true;
        config.mark_command("keep-zip");
        assert_eq!(config.get_source("keep-zip"), Some(&ConfigSource::Command));
    }
}
