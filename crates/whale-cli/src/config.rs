//! Global command line options and how they layer onto `whale.toml`.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use whale_pm::config::{Config, Strategy};

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use this whale.toml instead of searching upward from the working directory
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Where output folders and files are written
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// How packages are obtained: http or nuget-cli
    #[arg(long, value_name = "STRATEGY", global = true)]
    pub strategy: Option<String>,

    /// Path to the nuget executable
    #[arg(long, value_name = "PATH", global = true)]
    pub nuget_path: Option<PathBuf>,

    /// Package download endpoint for the http strategy
    #[arg(long, value_name = "URL", global = true)]
    pub registry: Option<String>,

    /// Only fetch the requested packages, not their dependencies
    #[arg(long, global = true)]
    pub no_recursive: bool,

    /// Keep the intermediate zip next to the Base64 file
    #[arg(long, global = true)]
    pub keep_zip: bool,
}

/// Build the effective configuration: files and environment first, then flags.
pub fn load_config(args: &GlobalArgs) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let mut config = Config::build(Some(&cwd), args.config.as_deref(), true)
        .context("Failed to load configuration")?;

    apply_flags(&mut config, args)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_flags(config: &mut Config, args: &GlobalArgs) -> Result<()> {
    if let Some(strategy) = &args.strategy {
        let Some(parsed) = Strategy::from_str(strategy) else {
            bail!("Unknown strategy '{}' (expected http or nuget-cli)", strategy);
        };
        config.strategy = parsed;
        config.mark_command("strategy");
    }
    if let Some(path) = &args.nuget_path {
        config.nuget_path = path.clone();
        config.mark_command("nuget-path");
    }
    if let Some(url) = &args.registry {
        config.registry_url = url.clone();
        config.mark_command("registry-url");
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
        config.mark_command("output-dir");
    }
    if args.no_recursive {
        config.recursive = false;
        config.mark_command("recursive");
    }
    if args.keep_zip {
        config.keep_zip = true;
        config.mark_command("keep-zip");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use whale_pm::config::ConfigSource;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::new();
        let args = GlobalArgs {
            strategy: Some("nuget".to_string()),
            nuget_path: Some(PathBuf::from("/usr/local/bin/nuget")),
            no_recursive: true,
            keep_zip: true,
            ..Default::default()
        };

        apply_flags(&mut config, &args).unwrap();

        assert_eq!(config.strategy, Strategy::NugetCli);
        assert_eq!(config.nuget_path, PathBuf::from("/usr/local/bin/nuget"));
        assert!(!config.recursive);
        assert!(config.keep_zip);
        assert_eq!(config.get_source("recursive"), Some(&ConfigSource::Command));
        assert_eq!(config.get_source("output-dir"), None);
    }

    #[test]
    fn test_unknown_strategy() {
        let mut config = Config::new();
        let args = GlobalArgs { strategy: Some("ftp".to_string()), ..Default::default() };
        assert!(apply_flags(&mut config, &args).is_err());
    }

    #[test]
    fn test_absent_flags_leave_config_alone() {
        let mut config = Config::new();
        apply_flags(&mut config, &GlobalArgs::default()).unwrap();
        assert!(config.recursive);
        assert!(!config.keep_zip);
    }
}
