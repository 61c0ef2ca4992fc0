//! Lossless Base64 transcoding of whole files.
//!
//! Output uses the standard alphabet with `=` padding and no line breaks.
//! Results are written to a temporary file beside the destination and only
//! persisted once complete, so a failed run never leaves a partial output.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use base64::Engine as _;
use tempfile::NamedTempFile;

use crate::error::TranscodeError;

/// Encode `input` as Base64 text into `output`, returning the encoded length.
pub fn encode_file(input: &Path, output: &Path) -> Result<u64, TranscodeError> {
    let source = open_input(input)?;
    let original_len = source.metadata().map(|m| m.len()).unwrap_or(0);

    let encoded_len = write_atomically(output, |tmp| {
        let mut encoder = EncoderWriter::new(tmp, &STANDARD);
        io::copy(&mut BufReader::new(source), &mut encoder)?;
        encoder.finish()?;
        Ok(())
    })?;

    log::info!(
        "Encoded {} ({} bytes) to {} ({} bytes)",
        input.display(),
        original_len,
        output.display(),
        encoded_len
    );
    Ok(encoded_len)
}

/// Decode the Base64 text in `input` into `output`, returning the decoded length.
///
/// ASCII whitespace (such as a trailing newline) is ignored; anything else
/// outside the standard alphabet is an error and no output is written.
pub fn decode_file(input: &Path, output: &Path) -> Result<u64, TranscodeError> {
    let mut text = Vec::new();
    open_input(input)?
        .read_to_end(&mut text)
        .map_err(|source| TranscodeError::Read { path: input.to_path_buf(), source })?;
    text.retain(|b| !b.is_ascii_whitespace());

    let bytes = STANDARD
        .decode(&text)
        .map_err(|source| TranscodeError::InvalidBase64 { path: input.to_path_buf(), source })?;

    let written = write_atomically(output, |tmp| tmp.write_all(&bytes))?;

    log::info!("Decoded {} to {} ({} bytes)", input.display(), output.display(), written);
    Ok(written)
}

fn open_input(input: &Path) -> Result<File, TranscodeError> {
    File::open(input).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            TranscodeError::InputMissing { path: input.to_path_buf() }
        } else {
            TranscodeError::Read { path: input.to_path_buf(), source }
        }
    })
}

/// Run `write` against a temp file in the destination's directory, then move it into place.
fn write_atomically<F>(output: &Path, write: F) -> Result<u64, TranscodeError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let write_err = |source: io::Error| TranscodeError::Write { path: output.to_path_buf(), source };

    let parent = output_dir(output);
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    // Dropping the temp file on any error path deletes it
    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    write(tmp.as_file_mut()).map_err(write_err)?;
    tmp.as_file_mut().flush().map_err(write_err)?;

    let len = tmp.as_file().metadata().map_err(write_err)?.len();
    tmp.persist(output).map_err(|err| write_err(err.error))?;
    Ok(len)
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
