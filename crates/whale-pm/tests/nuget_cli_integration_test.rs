//! Runs the nuget-cli strategy against a shell script standing in for `nuget`.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use whale_pm::archive::list_entries;
use whale_pm::error::{AcquisitionError, FetchError, WhaleError};
use whale_pm::{Acquirer, Config, NugetCliFetcher, PackageRequest, Strategy, Workflow};

const FAKE_NUGET: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
id="$2"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -OutputDirectory) out="$2"; shift ;;
  esac
  shift
done
case "$id" in
  Missing*) echo "Unable to find package '$id'" >&2; exit 1 ;;
  Noisy*) echo "Unable to load the service index for source" >&2; exit 0 ;;
  Silent*) exit 0 ;;
esac
mkdir -p "$out/$id/lib"
printf '<package><metadata><id>%s</id><dependencies><dependency id="Dep" version="[1.0, )"/></dependencies></metadata></package>' "$id" > "$out/$id/$id.nuspec"
echo "binary" > "$out/$id/lib/$id.dll"
echo "Successfully installed '$id'"
"#;

fn install_fake_nuget(dir: &Path) -> PathBuf {
    let path = dir.join("nuget");
    fs::write(&path, FAKE_NUGET).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn config(temp: &TempDir, nuget: PathBuf) -> Config {
    let mut config = Config::new();
    config.strategy = Strategy::NugetCli;
    config.nuget_path = nuget;
    config.output_dir = temp.path().join("out");
    config.scratch_dir = Some(temp.path().join("scratch"));
    config.keep_zip = true;
    config
}

#[test]
fn test_download_with_nuget_cli() {
    let temp = TempDir::new().unwrap();
    let tools = temp.path().join("tools");
    fs::create_dir_all(&tools).unwrap();
    let nuget = install_fake_nuget(&tools);

    let workflow = Workflow::from_config(config(&temp, nuget)).unwrap();
    assert_eq!(workflow.acquirer().strategy_name(), "nuget-cli");

    let requests = vec![
        PackageRequest::new("Good.Pkg").with_version("1.2.3"),
        PackageRequest::new("Missing.Pkg"),
        PackageRequest::new("Noisy.Pkg"),
        PackageRequest::new("Silent.Pkg"),
    ];
    let summary = workflow.download_and_archive(&requests, |_| {}).unwrap();

    assert_eq!(summary.succeeded, vec![PackageRequest::new("Good.Pkg").with_version("1.2.3")]);
    let reasons: Vec<&FetchError> = summary
        .failed
        .iter()
        .map(|failure| match failure {
            AcquisitionError::Package { source, .. } => source,
            other => panic!("unexpected failure {other}"),
        })
        .collect();
    assert!(matches!(reasons[0], FetchError::ToolFailed { status: Some(1), .. }));
    assert!(matches!(reasons[1], FetchError::ToolStderr { .. }));
    assert!(matches!(reasons[2], FetchError::MissingOutput { .. }));

    let logged = calls(&tools);
    assert_eq!(logged.len(), 4);
    assert!(logged[0].starts_with("install Good.Pkg -Version 1.2.3 -OutputDirectory "));
    assert!(logged[0].ends_with("-ExcludeVersion -NonInteractive"));

    assert_eq!(
        list_entries(summary.archive.as_ref().unwrap()).unwrap(),
        vec!["Good.Pkg/Good.Pkg.nuspec", "Good.Pkg/lib/Good.Pkg.dll"]
    );
    let readme = fs::read_to_string(summary.readme.unwrap()).unwrap();
    assert!(readme.contains("* Good.Pkg\n  - Dep (Version: >= 1.0)\n"));
}

#[test]
fn test_non_recursive_passes_dependency_flag() {
    let temp = TempDir::new().unwrap();
    let nuget = install_fake_nuget(temp.path());
    let fetcher = NugetCliFetcher::new(&nuget)
        .with_recursive(false)
        .with_source("https://example.test/feed");
    let acquirer = Acquirer::with_fetcher(Box::new(fetcher));

    acquirer
        .acquire_all(&[PackageRequest::new("Good.Pkg")], &temp.path().join("packages"), |_| {})
        .unwrap();

    let logged = calls(temp.path());
    assert!(logged[0].ends_with(
        "-ExcludeVersion -NonInteractive -Source https://example.test/feed -DependencyVersion Ignore"
    ));
}

#[test]
fn test_missing_tool_is_fatal_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let workflow = Workflow::from_config(config(&temp, temp.path().join("no-such-nuget"))).unwrap();

    let err = workflow
        .download_and_archive(&[PackageRequest::new("Good.Pkg")], |_| {})
        .unwrap_err();

    assert!(matches!(err, WhaleError::Acquisition(AcquisitionError::ToolNotFound { .. })));
    let scratch = temp.path().join("scratch");
    assert!(fs::read_dir(scratch).map_or(true, |mut d| d.next().is_none()));
    assert!(!temp.path().join("out").exists());
}
