//! Interactive prompts used when arguments are missing.

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::io::IsTerminal;
use std::path::PathBuf;

use whale_pm::package::{is_exit_command, parse_package_list};
use whale_pm::PackageRequest;

use crate::output::Output;

/// What the interactive menu offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Download,
    Archive,
    Encode,
    Decode,
    Dependencies,
}

const MENU: &[(&str, Option<Mode>)] = &[
    ("Download NuGet packages and archive them", Some(Mode::Download)),
    ("Archive a local folder", Some(Mode::Archive)),
    ("Encode a file to Base64", Some(Mode::Encode)),
    ("Decode a Base64 file", Some(Mode::Decode)),
    ("List dependencies of downloaded packages", Some(Mode::Dependencies)),
    ("Exit", None),
];

fn ensure_terminal() -> Result<()> {
    if !std::io::stdin().is_terminal() {
        bail!("Input is not a terminal; pass arguments instead (see --help)");
    }
    Ok(())
}

/// Show the mode menu; `None` means the user chose to leave.
pub fn choose_mode() -> Result<Option<Mode>> {
    ensure_terminal()?;

    let labels: Vec<&str> = MENU.iter().map(|(label, _)| *label).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What should the whale do?")
        .items(&labels)
        .default(0)
        .interact_opt()
        .context("Failed to show selection prompt")?;

    Ok(selection.and_then(|idx| MENU[idx].1))
}

/// Ask for a package list until it parses; `None` when the user types `exit`.
pub fn ask_packages(output: &Output) -> Result<Option<Vec<PackageRequest>>> {
    ensure_terminal()?;

    loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Packages (Id or Id@Version, comma or space separated; 'exit' to cancel)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read package list")?;

        match interpret_package_input(&input) {
            PackageInput::Exit => return Ok(None),
            PackageInput::Requests(requests) => return Ok(Some(requests)),
            PackageInput::Invalid(message) => output.error(&message),
        }
    }
}

/// Ask for a path; `None` when the user types `exit` or leaves it empty.
pub fn ask_path(prompt: &str) -> Result<Option<PathBuf>> {
    ensure_terminal()?;

    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .context("Failed to read path")?;

    let input = input.trim();
    if input.is_empty() || is_exit_command(input) {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(input)))
}

#[derive(Debug, PartialEq, Eq)]
enum PackageInput {
    Exit,
    Requests(Vec<PackageRequest>),
    Invalid(String),
}

fn interpret_package_input(input: &str) -> PackageInput {
    if is_exit_command(input) {
        return PackageInput::Exit;
    }
    match parse_package_list(input) {
        Ok(requests) => PackageInput::Requests(requests),
        Err(err) => PackageInput::Invalid(err.to_string()),
    }
}
