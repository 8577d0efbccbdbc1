//! Run a single templated command without building a pipeline.
//!
//! `check_cmd` and `try_cmd` run a command for its side effects or exit
//! status, with stdout inherited. `slurp_cmd` and `try_slurp_cmd` capture
//! stdout and strip trailing newlines, like `$(...)` in a shell. The `try_`
//! variants report a non-zero exit in their return value; failing to start
//! the command is still an error.

use std::fs::File;
use std::path::PathBuf;

use crate::commands::Stderr;
use crate::commands::run::{Destination, execute, settle};
use crate::error::PipelineError;
use crate::filter::{Args, strip_trailing_newlines};
use crate::words::split_words;

/// Where `check_cmd` and `try_cmd` send the command's stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stdout {
    #[default]
    Inherit,
    Null,
    /// Created, or truncated if it exists.
    File(PathBuf),
}

/// Process options for the `*_cmd` helpers.
#[derive(Debug, Clone, Default)]
pub struct CmdOptions {
    /// Bytes fed to the command's stdin; stdin is null when absent.
    pub stdin: Option<Vec<u8>>,
    /// Ignored by the slurp helpers, which capture stdout.
    pub stdout: Stdout,
    pub stderr: Stderr,
    pub cwd: Option<PathBuf>,
}

fn words(template: &str, args: &Args) -> Result<Vec<String>, PipelineError> {
    let words = split_words(template, &args.positional, &args.named)?;
    if words.is_empty() {
        return Err(PipelineError::EmptyCommand(template.to_string()));
    }
    Ok(words)
}

fn launch(
    template: &str,
    args: &Args,
    options: &CmdOptions,
    capture: bool,
    check: bool,
) -> Result<(bool, Vec<u8>), PipelineError> {
    let words = words(template, args)?;
    let mut captured = Vec::new();
    let out = match &options.stdout {
        _ if capture => Destination::Capture(&mut captured),
        Stdout::Inherit => Destination::Inherit,
        Stdout::Null => Destination::Null,
        Stdout::File(path) => Destination::File(File::create(path)?),
    };
    let status = execute(
        &words,
        options.stdin.as_deref(),
        options.stderr,
        options.cwd.as_deref(),
        out,
    )?;
    let ok = settle(&words, status, check)?;
    Ok((ok, captured))
}

/// Run the command; a non-zero exit is an error.
pub fn check_cmd(template: &str, args: &Args, options: &CmdOptions) -> Result<(), PipelineError> {
    launch(template, args, options, false, true).map(|_| ())
}

/// Run the command; returns whether it exited successfully.
pub fn try_cmd(template: &str, args: &Args, options: &CmdOptions) -> Result<bool, PipelineError> {
    launch(template, args, options, false, false).map(|(ok, _)| ok)
}

/// Run the command and return its stdout without trailing newlines.
pub fn slurp_cmd(template: &str, args: &Args, options: &CmdOptions) -> Result<Vec<u8>, PipelineError> {
    let (_, out) = launch(template, args, options, true, true)?;
    Ok(strip_trailing_newlines(out))
}

/// As [`slurp_cmd`], but `None` when the command exits non-zero.
pub fn try_slurp_cmd(
    template: &str,
    args: &Args,
    options: &CmdOptions,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let (ok, out) = launch(template, args, options, true, false)?;
    Ok(ok.then(|| strip_trailing_newlines(out)))
}
