//! Download command - fetch packages and produce a Base64-encoded archive.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use whale_pm::package::parse_package_list;
use whale_pm::{PackageOutcome, PackageRequest, Workflow};

use super::Session;
use crate::progress::file_size;
use crate::prompt;

#[derive(Args, Debug, Default)]
pub struct DownloadArgs {
    /// Packages as Id or Id@Version; prompts when omitted
    #[arg(value_name = "PACKAGES")]
    pub packages: Vec<String>,
}

pub fn execute(args: DownloadArgs, session: Session) -> Result<i32> {
    let requests = match requests_from_args(&args)? {
        Some(requests) => requests,
        None => match prompt::ask_packages(&session.output)? {
            Some(requests) => requests,
            None => {
                session.output.info("Cancelled.");
                return Ok(0);
            }
        },
    };

    run(requests, session)
}

/// Parse packages given on the command line; `None` when there are none.
fn requests_from_args(args: &DownloadArgs) -> Result<Option<Vec<PackageRequest>>> {
    if args.packages.is_empty() {
        return Ok(None);
    }
    let joined = args.packages.join(" ");
    let requests = parse_package_list(&joined).context("Invalid package list")?;
    Ok(Some(requests))
}

pub fn run(requests: Vec<PackageRequest>, session: Session) -> Result<i32> {
    let Session { config, output, progress } = session;
    let workflow = Workflow::from_config(config).context("Failed to set up package acquisition")?;

    output.info(&format!(
        "Puuping {} package(s) via {}",
        requests.len(),
        workflow.acquirer().strategy_name()
    ));

    let bar = progress.create_operation_bar(requests.len() as u64);
    let mut lines = Vec::new();
    let result = workflow.download_and_archive(&requests, |outcome| {
        match outcome {
            PackageOutcome::Acquired { request, .. } => {
                bar.set_message(request.to_string());
                lines.push((true, request.to_string()));
            }
            PackageOutcome::Failed { request, error } => {
                bar.set_message(request.to_string());
                lines.push((false, error.to_string()));
            }
        }
        bar.inc(1);
    });
    bar.finish_and_clear();

    for (ok, line) in &lines {
        if *ok {
            output.list_item("✓", line);
        } else {
            output.failed_item("✗", line);
        }
    }

    let summary = result.context("Download failed")?;

    output.section("Whale puup complete");
    output.list_item("Folder:", &summary.output_folder.display().to_string());
    output.list_item(
        "Base64:",
        &format!("{} ({})", summary.encoded.display(), file_size(&summary.encoded)),
    );
    if let Some(archive) = &summary.archive {
        output.list_item("Zip:", &format!("{} ({})", archive.display(), file_size(archive)));
    }
    if let Some(readme) = &summary.readme {
        output.list_item("Readme:", &readme.display().to_string());
    }
    output.verbose(&format!("{} file(s) archived", summary.entry_count));

    if !summary.failed.is_empty() {
        output.warning(&format!(
            "{} of {} package(s) could not be acquired: {}",
            summary.failed.len(),
            requests.len(),
            summary
                .failed
                .iter()
                .filter_map(|f| f.package())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    output.success(&format!(
        "{} {} package(s) archived",
        style("Done:").green().bold(),
        summary.succeeded.len()
    ));
    Ok(0)
}
