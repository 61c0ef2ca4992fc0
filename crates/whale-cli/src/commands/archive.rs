//! Archive command - zip a local folder and Base64-encode the zip.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use whale_pm::Workflow;

use super::Session;
use crate::progress::file_size;

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Folder to archive
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,
}

pub fn execute(args: ArchiveArgs, session: Session) -> Result<i32> {
    let Session { config, output, progress } = session;
    let workflow = Workflow::from_config(config)?;

    let spinner = progress.create_spinner(&format!("Archiving {}", args.folder.display()));
    let result = workflow.archive_folder(&args.folder);
    spinner.finish_and_clear();

    let archived = result.with_context(|| format!("Failed to archive {}", args.folder.display()))?;

    output.success(&format!("Archived {} file(s)", archived.entry_count));
    output.list_item(
        "Base64:",
        &format!("{} ({})", archived.encoded.display(), file_size(&archived.encoded)),
    );
    if let Some(zip) = &archived.archive {
        output.list_item("Zip:", &format!("{} ({})", zip.display(), file_size(zip)));
    }
    Ok(0)
}
