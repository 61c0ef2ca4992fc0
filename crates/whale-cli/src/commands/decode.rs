//! Decode command - restore the original file from Base64 text.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use whale_pm::Workflow;

use super::Session;
use crate::progress::file_size;

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Base64 text file to decode
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output file (default: <FILE without .base64.txt>.zip)
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,
}

pub fn execute(args: DecodeArgs, session: Session) -> Result<i32> {
    let Session { config, output, progress } = session;
    let workflow = Workflow::from_config(config)?;

    let spinner = progress.create_spinner(&format!("Decoding {}", args.file.display()));
    let result = workflow.decode(&args.file, args.output.as_deref());
    spinner.finish_and_clear();

    let decoded = result.with_context(|| format!("Failed to decode {}", args.file.display()))?;
    output.success(&format!("Decoded to {} ({})", decoded.display(), file_size(&decoded)));
    Ok(0)
}
