//! Command execution helpers.
//!
//! Every disk utility is driven through one of these helpers so spawn
//! failures and non-zero exits are reported uniformly, with the command line
//! and its stderr attached.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{Error, IoResultExt, Result};

/// Renders a command as `program arg1 arg2 ...` for logs and errors.
///
/// Only used on commands whose arguments carry no secrets; passphrases
/// travel through stdin.
pub fn describe(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    out
}

/// Runs a command to completion and returns its output, whatever the exit code.
pub fn run_command(cmd: &mut Command) -> Result<Output> {
    let command = describe(cmd);
    debug!(%command, "running");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .command_context(command)
}

/// Runs a command, failing with [`Error::CommandExit`] on a non-zero exit.
pub fn run_checked(cmd: &mut Command) -> Result<Output> {
    let output = run_command(cmd)?;
    check_exit(cmd, output)
}

/// Runs a command with `input` written to its stdin, failing on a non-zero exit.
///
/// Stdin is closed after writing so the child sees EOF.
pub fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> Result<Output> {
    let command = describe(cmd);
    debug!(%command, "running with piped stdin");

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .command_context(command.clone())?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).command_context(command.clone())?;
    }

    let output = child.wait_with_output().command_context(command)?;
    check_exit(cmd, output)
}

/// Runs a command and returns only its exit code.
///
/// A process killed by a signal reports `-1`.
pub fn run_status(cmd: &mut Command) -> Result<i32> {
    let output = run_command(cmd)?;
    Ok(output.status.code().unwrap_or(-1))
}

fn check_exit(cmd: &Command, output: Output) -> Result<Output> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::CommandExit {
            command: describe(cmd),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }
    Ok(output)
}
