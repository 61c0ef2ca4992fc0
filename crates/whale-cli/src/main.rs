mod commands;
mod config;
mod output;
mod progress;
mod prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::process::ExitCode;

use commands::archive::ArchiveArgs;
use commands::decode::DecodeArgs;
use commands::deps::DepsArgs;
use commands::download::DownloadArgs;
use commands::encode::EncodeArgs;
use commands::Session;
use config::GlobalArgs;
use output::{Output, Verbosity};
use progress::ProgressManager;
use prompt::Mode;

#[derive(Parser, Debug)]
#[command(name = "whale-puup")]
#[command(about = "Download NuGet packages into a single Base64-encoded archive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download packages (with dependencies) and archive them
    Download(DownloadArgs),

    /// Archive a local folder
    Archive(ArchiveArgs),

    /// Encode a file as Base64 text
    Encode(EncodeArgs),

    /// Decode a Base64 text file
    Decode(DecodeArgs),

    /// List dependencies declared by downloaded packages
    Deps(DepsArgs),
}

fn init_logger(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.log_level())
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .init();
}

/// Turn a menu choice into a command, prompting for what it needs.
fn command_from_menu(output: &Output) -> Result<Option<Commands>> {
    let Some(mode) = prompt::choose_mode()? else {
        return Ok(None);
    };

    let command = match mode {
        Mode::Download => match prompt::ask_packages(output)? {
            Some(requests) => Commands::Download(DownloadArgs {
                packages: requests.iter().map(ToString::to_string).collect(),
            }),
            None => return Ok(None),
        },
        Mode::Archive => match prompt::ask_path("Folder to archive")? {
            Some(folder) => Commands::Archive(ArchiveArgs { folder }),
            None => return Ok(None),
        },
        Mode::Encode => match prompt::ask_path("File to encode")? {
            Some(file) => Commands::Encode(EncodeArgs { file, output: None }),
            None => return Ok(None),
        },
        Mode::Decode => match prompt::ask_path("Base64 file to decode")? {
            Some(file) => Commands::Decode(DecodeArgs { file, output: None }),
            None => return Ok(None),
        },
        Mode::Dependencies => match prompt::ask_path("Folder of downloaded packages")? {
            Some(folder) => Commands::Deps(DepsArgs { folder, json: false, write_readme: false }),
            None => return Ok(None),
        },
    };
    Ok(Some(command))
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.global.quiet, cli.global.verbose);
    init_logger(verbosity);

    let output = Output::new(verbosity);
    let config = config::load_config(&cli.global)?;
    log::debug!("Effective configuration: {:?}", config);

    let command = match cli.command {
        Some(command) => command,
        None => match command_from_menu(&output)? {
            Some(command) => command,
            None => {
                output.info("Bye!");
                return Ok(0);
            }
        },
    };

    let show_progress = !output.is_quiet() && std::io::stderr().is_terminal();
    let session = Session {
        config,
        output,
        progress: ProgressManager::new(show_progress),
    };

    match command {
        Commands::Download(args) => commands::download::execute(args, session),
        Commands::Archive(args) => commands::archive::execute(args, session),
        Commands::Encode(args) => commands::encode::execute(args, session),
        Commands::Decode(args) => commands::decode::execute(args, session),
        Commands::Deps(args) => commands::deps::execute(args, session),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
