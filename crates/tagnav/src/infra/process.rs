//! Blocking execution of external generator commands.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::domain::errors::GenerateError;

/// Split an option string on whitespace into program arguments.
pub fn split_args(options: &str) -> Vec<OsString> {
    options.split_whitespace().map(OsString::from).collect()
}

/// Run `command_line` (program followed by options) in `cwd` and wait for it to exit.
///
/// Only a failure to launch is reported; the exit status is returned for logging.
pub fn run_in(
    command_line: &str,
    extra_args: &[OsString],
    cwd: &Path,
) -> Result<ExitStatus, GenerateError> {
    let mut args = split_args(command_line);
    if args.is_empty() {
        return Err(GenerateError::EmptyCommand);
    }
    let program = args.remove(0);

    tracing::debug!(
        program = %program.to_string_lossy(),
        cwd = %cwd.display(),
        "running generator"
    );

    let status = Command::new(&program)
        .args(&args)
        .args(extra_args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .map_err(|source| GenerateError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

    if !status.success() {
        tracing::warn!(
            program = %program.to_string_lossy(),
            %status,
            "generator exited unsuccessfully"
        );
    }
    Ok(status)
}
