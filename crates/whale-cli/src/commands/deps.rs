//! Deps command - show the dependencies declared by a folder of packages.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::collections::BTreeSet;
use std::path::PathBuf;

use whale_pm::manifest::{read_dependencies, write_report, DependencyListing};

use super::Session;

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Folder holding one sub-folder per package
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Print the listing as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Also write readme_puup_file.txt into FOLDER
    #[arg(long)]
    pub write_readme: bool,
}

pub fn execute(args: DepsArgs, session: Session) -> Result<i32> {
    let mut output = session.output;
    output.set_json_mode(args.json);

    let index = read_dependencies(&args.folder)
        .with_context(|| format!("Failed to read packages in {}", args.folder.display()))?;

    if args.write_readme {
        let path = write_report(&index, &args.folder).context("Failed to write dependency report")?;
        output.verbose(&format!("Wrote {}", path.display()));
    }

    if output.is_json() {
        output.json(&index);
        return Ok(0);
    }

    if index.is_empty() {
        output.info(&format!("No package folders found in {}", args.folder.display()));
        return Ok(0);
    }

    let mut unique = BTreeSet::new();
    for (package, listing) in &index {
        output.section(package);
        match listing {
            DependencyListing::Unreadable(reason) => output.warning(reason),
            DependencyListing::Parsed(deps) if deps.is_empty() => {
                output.writeln(&format!("  {}", style("no dependencies").dim()));
            }
            DependencyListing::Parsed(deps) => {
                let mut group = None;
                for dep in deps {
                    let framework = dep.target_framework.as_deref();
                    if framework.is_some() && framework != group {
                        output.writeln(&format!("  {}", style(framework.unwrap_or_default()).yellow()));
                    }
                    group = framework;
                    output.list_item("-", &dep.to_string());
                    unique.insert(dep.id.as_str());
                }
            }
        }
    }

    output.section(&format!("{} unique dependencies", unique.len()));
    for id in unique {
        output.list_item("*", id);
    }
    Ok(0)
}
