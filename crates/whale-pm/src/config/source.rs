use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "whale.toml";

/// Represents the source of a configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From the global whale.toml
    Global,
    /// From a project whale.toml
    Project(PathBuf),
    /// From environment variable
    Environment(String),
    /// Set from the command line
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Global => "global",
            ConfigSource::Project(_) => "project",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Configuration as read from a `whale.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub strategy: Option<String>,
    pub nuget_path: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub source: Option<String>,
    pub recursive: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub keep_zip: Option<bool>,
    pub document_dependencies: Option<bool>,
    pub http_timeout: Option<u64>,
    pub user_agent: Option<String>,
}

/// Loads configuration from various sources
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
    config_home: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment, config_home: None }
    }

    /// Read the global whale.toml from `home` instead of the platform config dir
    pub fn with_config_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.config_home = Some(home.into());
        self
    }

    pub fn use_environment(&self) -> bool {
        self.use_environment
    }

    /// Get a raw environment variable, ignoring empty values
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Directory holding the global whale.toml
    pub fn get_config_home(&self) -> PathBuf {
        if let Some(home) = &self.config_home {
            return home.clone();
        }
        if let Some(home) = self.get_env("WHALE_HOME") {
            return PathBuf::from(home);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "whale-puup") {
            proj_dirs.config_dir().to_path_buf()
        } else if let Some(base_dirs) = directories::BaseDirs::new() {
            base_dirs.home_dir().join(".whale-puup")
        } else {
            PathBuf::from(".whale-puup")
        }
    }

    pub fn global_config_path(&self) -> PathBuf {
        self.get_config_home().join(CONFIG_FILE_NAME)
    }

    /// Load configuration from a TOML file; a missing file yields an empty config
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_global_config(&self) -> Result<RawConfig, ConfigError> {
        self.load_config_file(self.global_config_path())
    }

    /// Search upward from `start_dir` for a whale.toml
    pub fn find_project_config(&self, start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Get a configuration value from environment variable.
    /// Converts "nuget-path" to "WHALE_NUGET_PATH"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_env(&Self::env_var_name(key))
    }

    pub fn env_var_name(key: &str) -> String {
        format!("WHALE_{}", key.replace('-', "_").to_uppercase())
    }

    /// Get boolean value from environment variable
    pub fn get_env_bool(&self, key: &str) -> Option<bool> {
        self.get_env_config(key)
            .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
    }

    /// Get unsigned integer value from environment variable; a value that
    /// does not parse is an error rather than being ignored
    pub fn get_env_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.get_env_config(key) {
            None => Ok(None),
            Some(val) => val.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: Self::env_var_name(key),
                value: val,
            }),
        }
    }

    /// Get a path value from environment variable
    pub fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.get_env_config(key).map(PathBuf::from)
    }
}
