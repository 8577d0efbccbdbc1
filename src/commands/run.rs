//! `run`: an external command as a stream stage.
//!
//! The command line is a word template expanded at invocation time, so the
//! same bound filter can be run repeatedly. Upstream bytes, if any, are fed to
//! the child's stdin from a helper thread while its stdout is drained into
//! the stage's output.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::{
    Args, Endpoint, Filter, Input, Kind, Operation, Output, Param, ParamKind, Produced, Signature,
};
use crate::words::{Value, split_words};

/// Where a child's stderr goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stderr {
    /// The parent's stderr.
    #[default]
    Inherit,
    /// Discarded.
    Null,
    /// Merged into the stage's output.
    Stdout,
}

impl Stderr {
    pub fn as_str(self) -> &'static str {
        match self {
            Stderr::Inherit => "inherit",
            Stderr::Null => "null",
            Stderr::Stdout => "stdout",
        }
    }
}

impl fmt::Display for Stderr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stderr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inherit" => Ok(Stderr::Inherit),
            "null" => Ok(Stderr::Null),
            "stdout" => Ok(Stderr::Stdout),
            other => Err(format!(
                "stderr must be one of inherit, null, stdout; got {other:?}"
            )),
        }
    }
}

/// Options of a run stage, carried as `_check` and `_stderr` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Fail the stage when the command exits non-zero.
    pub check: bool,
    pub stderr: Stderr,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: true,
            stderr: Stderr::Inherit,
        }
    }
}

impl RunOptions {
    fn from_args(args: &Args) -> Result<Self, PipelineError> {
        let stderr = match args.get("_stderr").and_then(Value::as_str) {
            Some(s) => s.parse().map_err(|message| PipelineError::Arguments {
                op: "run".into(),
                message,
            })?,
            None => Stderr::default(),
        };
        Ok(Self {
            check: args.bool_or("_check", true),
            stderr,
        })
    }

    fn apply(self, args: Args) -> Args {
        args.named("_check", self.check)
            .named("_stderr", self.stderr.as_str())
    }
}

// ── Process execution ──

/// Render an argument vector for messages.
pub(crate) fn command_line(words: &[String]) -> String {
    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}

/// Where a spawned child's stdout goes.
pub(crate) enum Destination<'a> {
    /// Copied into a writer by the caller's thread.
    Capture(&'a mut dyn Write),
    Inherit,
    Null,
    File(File),
}

/// Spawn `words`, feed `stdin`, and route its stdout to `out`.
///
/// `Stderr::Stdout` sends stderr wherever stdout goes.
pub(crate) fn execute(
    words: &[String],
    stdin: Option<&[u8]>,
    stderr: Stderr,
    cwd: Option<&Path>,
    out: Destination<'_>,
) -> Result<ExitStatus, PipelineError> {
    let line = command_line(words);
    let Some((program, rest)) = words.split_first() else {
        return Err(PipelineError::EmptyCommand(line));
    };

    let mut command = Command::new(program);
    command.args(rest);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    match stderr {
        Stderr::Inherit => {
            command.stderr(Stdio::inherit());
        }
        Stderr::Null => {
            command.stderr(Stdio::null());
        }
        Stderr::Stdout => {}
    }
    let merge = stderr == Stderr::Stdout;
    let mut merged = None;
    let mut sink = None;
    match out {
        Destination::Capture(writer) => {
            sink = Some(writer);
            if merge {
                let (reader, writer) = io::pipe()?;
                command.stdout(writer.try_clone()?);
                command.stderr(writer);
                merged = Some(reader);
            } else {
                command.stdout(Stdio::piped());
            }
        }
        Destination::Inherit => {
            command.stdout(Stdio::inherit());
            if merge {
                command.stderr(io::stdout());
            }
        }
        Destination::Null => {
            command.stdout(Stdio::null());
            if merge {
                command.stderr(Stdio::null());
            }
        }
        Destination::File(file) => {
            if merge {
                command.stderr(file.try_clone()?);
            }
            command.stdout(file);
        }
    }

    log::debug!("spawning {line}");
    let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
        command: line.clone(),
        source,
    })?;
    // The command still holds our copies of the pipe's write end.
    drop(command);

    let source: Option<Box<dyn Read + Send>> = match merged {
        Some(reader) => Some(Box::new(reader)),
        None => child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>),
    };
    let feeder = child.stdin.take();

    let copied = thread::scope(|scope| -> io::Result<u64> {
        if let (Some(mut pipe), Some(bytes)) = (feeder, stdin) {
            scope.spawn(move || {
                if let Err(e) = pipe.write_all(bytes)
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    log::debug!("writing child stdin: {e}");
                }
            });
        }
        let copied = match (source, sink) {
            (Some(mut reader), Some(sink)) => io::copy(&mut reader, sink),
            _ => Ok(0),
        };
        // The reader is gone, so the child can block on stdout while the
        // feeder blocks on its stdin. Kill it to release both before joining.
        if copied.is_err()
            && let Err(e) = child.kill()
        {
            log::debug!("killing {line}: {e}");
        }
        copied
    });

    let status = child.wait()?;
    let copied = copied?;
    log::debug!("{line} exited with {status} after {copied} bytes of output");
    Ok(status)
}

/// Turn an unsuccessful exit into an error when `check` is set; otherwise log it.
pub(crate) fn settle(words: &[String], status: ExitStatus, check: bool) -> Result<bool, PipelineError> {
    if status.success() {
        return Ok(true);
    }
    let command = command_line(words);
    if check {
        return Err(PipelineError::ProcessFailed {
            command,
            code: status.code(),
        });
    }
    log::warn!("{command} failed ({status}), continuing");
    Ok(false)
}

// ── Operation ──

static SIGNATURE: Signature = Signature {
    input: Endpoint::optional(Kind::Stream),
    output: Endpoint::required(Kind::Stream),
    positional: &[
        Param::one("template", ParamKind::Text),
        Param::variadic("values", ParamKind::Any),
    ],
    keywords: &[
        Param::optional("_check", ParamKind::Bool),
        Param::optional("_stderr", ParamKind::Text),
    ],
    extra_keywords: true,
};

/// `run`: an external command reading and writing byte streams.
pub struct Run;

impl Operation for Run {
    fn name(&self) -> &'static str {
        "run"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        let options = RunOptions::from_args(args)?;
        let Some((template, values)) = args.positional.split_first() else {
            return Err(PipelineError::Arguments {
                op: "run".into(),
                message: "missing argument template".into(),
            });
        };
        let template = template.as_str().unwrap_or_default();
        let words = split_words(template, values, &args.template_values())?;
        if words.is_empty() {
            return Err(PipelineError::EmptyCommand(template.to_string()));
        }

        let stdin = match input.into_reader() {
            Some(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Some(buf)
            }
            None => None,
        };

        let mut discard = io::sink();
        let sink: &mut dyn Write = match output.writer() {
            Some(w) => w,
            None => &mut discard,
        };
        let status = execute(
            &words,
            stdin.as_deref(),
            options.stderr,
            None,
            Destination::Capture(sink),
        )?;
        settle(&words, status, options.check)?;
        Ok(Produced::Done)
    }
}

/// Run `template` expanded with `values`, checked, stderr inherited.
pub fn run<I, V>(template: &str, values: I) -> Filter
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    run_with(template, values, RunOptions::default())
}

/// As [`run`], with explicit options.
pub fn run_with<I, V>(template: &str, values: I, options: RunOptions) -> Filter
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let args = values
        .into_iter()
        .fold(Args::new().arg(template), |args, v| args.arg(v));
    bound(Arc::new(Run), options.apply(args))
}
