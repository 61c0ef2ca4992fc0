//! Configuration for WHALE-PUUP.
//!
//! Values are layered, highest priority last:
//!
//! 1. Built-in defaults
//! 2. Global `whale.toml` in the platform config directory (or `$WHALE_HOME`)
//! 3. Project `whale.toml`, searched upward from the working directory
//! 4. Environment variables (`WHALE_*`)
//!
//! Command-line flags are applied on top by the CLI, followed by
//! [`Config::validate`].
//!
//! ```rust,no_run
//! use whale_pm::config::Config;
//! use std::path::Path;
//!
//! let config = Config::build(Some(Path::new(".")), None, true).unwrap();
//! println!("Strategy: {}", config.strategy);
//! println!("Registry: {}", config.registry_base().unwrap());
//! ```

mod config;
mod source;

pub use config::{Config, Strategy, DEFAULT_REGISTRY_URL};
pub use source::{ConfigLoader, ConfigSource, RawConfig, CONFIG_FILE_NAME};
