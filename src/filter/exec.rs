//! Run a pipeline and collect or forward its output.

use std::io::{self, Write};

use super::{Filter, Input, Kind, Outcome, Output};
use crate::error::PipelineError;

fn require_handle_output(filter: &Filter, wanted: &'static str) -> Result<(), PipelineError> {
    if filter.output().kind.is_handle() {
        Ok(())
    } else {
        Err(PipelineError::WrongOutput {
            filter: filter.label().to_string(),
            kind: filter.output().kind,
            wanted,
        })
    }
}

/// Drop every trailing `\n`.
pub fn strip_trailing_newlines(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    bytes
}

/// Invoke `filter` and return its output with trailing newlines removed.
pub fn slurp(filter: &Filter) -> Result<Vec<u8>, PipelineError> {
    require_handle_output(filter, "slurped")?;
    let bytes = match filter.invoke()? {
        Outcome::Bytes(bytes) => bytes,
        Outcome::Text(text) => text.into_bytes(),
        _ => Vec::new(),
    };
    Ok(strip_trailing_newlines(bytes))
}

/// As [`slurp`], decoded as UTF-8.
pub fn slurp_text(filter: &Filter) -> Result<String, PipelineError> {
    String::from_utf8(slurp(filter)?).map_err(|e| PipelineError::InvalidUtf8 {
        position: e.utf8_error().valid_up_to(),
    })
}

/// Invoke `filter` with the process's standard output as its output handle.
pub fn to_stdout(filter: &Filter) -> Result<(), PipelineError> {
    require_handle_output(filter, "written to stdout")?;
    let input = filter.input();
    if !input.may_be_absent() {
        return Err(PipelineError::Unsatisfiable {
            filter: filter.label().to_string(),
            kind: input.kind,
        });
    }

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let handle = if filter.output().kind == Kind::Text {
        Output::Text(&mut lock)
    } else {
        Output::Stream(&mut lock)
    };
    filter.call(Input::None, handle)?;
    lock.flush()?;
    Ok(())
}
