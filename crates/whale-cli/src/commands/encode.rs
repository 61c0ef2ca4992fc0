//! Encode command - turn any file into Base64 text.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use whale_pm::Workflow;

use super::Session;
use crate::progress::file_size;

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// File to encode
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output file (default: <FILE>.base64.txt)
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,
}

pub fn execute(args: EncodeArgs, session: Session) -> Result<i32> {
    let Session { config, output, progress } = session;
    let workflow = Workflow::from_config(config)?;

    let spinner = progress.create_spinner(&format!("Encoding {}", args.file.display()));
    let result = workflow.encode(&args.file, args.output.as_deref());
    spinner.finish_and_clear();

    let encoded = result.with_context(|| format!("Failed to encode {}", args.file.display()))?;
    output.success(&format!("Encoded to {} ({})", encoded.display(), file_size(&encoded)));
    Ok(0)
}
