//! Subcommands of whale-puup.

pub mod archive;
pub mod decode;
pub mod deps;
pub mod download;
pub mod encode;

use whale_pm::Config;

use crate::output::Output;
use crate::progress::ProgressManager;

/// Everything a command needs besides its own arguments
pub struct Session {
    pub config: Config,
    pub output: Output,
    pub progress: ProgressManager,
}
