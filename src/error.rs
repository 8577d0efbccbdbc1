//! Error types for template expansion and pipeline execution.
//!
//! [`TemplateError`] separates malformed markup ([`TemplateError::Syntax`])
//! from well-formed markup used illegally ([`TemplateError::Usage`]) and from
//! values a format spec cannot render ([`TemplateError::Format`]).
//! [`PipelineError`] covers composition, argument binding and process failures.

use std::io;

use thiserror::Error;

use crate::filter::Kind;

// ── Template errors ──

/// Malformed template markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// `{` with no closing `}`.
    #[error("expected '}}' before end of template")]
    UnmatchedOpen,
    /// A lone `}` outside any field.
    #[error("single '}}' encountered")]
    UnmatchedClose,
    /// Field reference that is not `''`, digits, or an identifier, or a bad `.attr` / `[index]`.
    #[error("invalid field reference {0:?}")]
    InvalidReference(String),
    #[error("missing conversion after '!'")]
    EmptyConversion,
    /// Conversion character other than `s` or `@`.
    #[error("unknown conversion specifier {0:?}")]
    UnknownConversion(char),
    /// Conversion followed by something other than `:` or `}`.
    #[error("expected ':' or '}}' after conversion specifier")]
    TrailingAfterConversion,
    #[error("nested fields are not allowed in a format spec")]
    NestedField,
}

/// Well-formed markup that cannot be applied to the given values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("cannot switch between automatic and manual field numbering")]
    MixedNumbering,
    /// Positional index past the end of the positional values.
    #[error("no positional value at index {0}")]
    MissingPositional(usize),
    #[error("no named value {0:?}")]
    MissingKey(String),
    /// `.attr` or `[index]` not supported by the value it was applied to.
    #[error("{0}")]
    InvalidAccess(String),
    #[error("'!@' needs a list value, got {0}")]
    SpreadNotList(&'static str),
    /// `!@` field sharing its word with other text.
    #[error("'!@' field must be a whole word by itself")]
    SpreadNotWholeWord,
}

/// Failure to expand a template into words.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("template syntax error at offset {offset} in {template:?}: {kind}")]
    Syntax {
        template: String,
        /// Character offset into `template`.
        offset: usize,
        kind: SyntaxError,
    },

    #[error("template usage error at offset {offset} in {template:?}: {kind}")]
    Usage {
        template: String,
        offset: usize,
        kind: UsageError,
    },

    #[error("cannot format field at offset {offset} in {template:?}: {message}")]
    Format {
        template: String,
        offset: usize,
        message: String,
    },
}

impl TemplateError {
    /// Short category name: `syntax`, `usage`, or `format`.
    pub fn category(&self) -> &'static str {
        match self {
            TemplateError::Syntax { .. } => "syntax",
            TemplateError::Usage { .. } => "usage",
            TemplateError::Format { .. } => "format",
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            TemplateError::Syntax { offset, .. }
            | TemplateError::Usage { offset, .. }
            | TemplateError::Format { offset, .. } => *offset,
        }
    }
}

// ── Pipeline errors ──

/// Failure to compose, bind, or run a filter.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("cannot pipe {left} output into {right} input")]
    KindMismatch { left: Kind, right: Kind },

    #[error("cannot pipe through a 'none' endpoint ({filter})")]
    NoneEndpoint { filter: String },

    #[error("{filter} needs {kind} input and cannot be invoked on its own")]
    Unsatisfiable { filter: String, kind: Kind },

    #[error("{filter}: {side} does not match endpoint kind {expected}")]
    HandleMismatch {
        filter: String,
        side: &'static str,
        expected: Kind,
    },

    #[error("{filter}: output kind {kind} cannot be {wanted}")]
    WrongOutput {
        filter: String,
        kind: Kind,
        wanted: &'static str,
    },

    #[error("{op}: {message}")]
    Arguments { op: String, message: String },

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("command template {0:?} produced no words")]
    EmptyCommand(String),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command {command} failed{}", exit_suffix(.code))]
    ProcessFailed {
        /// Shell-quoted rendering of the resolved argument vector.
        command: String,
        /// Exit code, or `None` when the process was killed by a signal.
        code: Option<i32>,
    },

    #[error("invalid UTF-8 at byte {position}")]
    InvalidUtf8 { position: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {c}"),
        None => " (terminated by signal)".into(),
    }
}

impl PipelineError {
    /// Short category name used by the CLI's error responses.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Template(t) => t.category(),
            PipelineError::KindMismatch { .. }
            | PipelineError::NoneEndpoint { .. }
            | PipelineError::Unsatisfiable { .. }
            | PipelineError::HandleMismatch { .. }
            | PipelineError::WrongOutput { .. } => "composition",
            PipelineError::Arguments { .. } | PipelineError::UnknownOperation(_) => "arguments",
            PipelineError::EmptyCommand(_)
            | PipelineError::Spawn { .. }
            | PipelineError::ProcessFailed { .. } => "process",
            PipelineError::InvalidUtf8 { .. } | PipelineError::Io(_) => "io",
        }
    }

    /// Exit code carried by a checked process failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::ProcessFailed { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_message_includes_code() {
        let err = PipelineError::ProcessFailed {
            command: "false".into(),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "command false failed with exit code 1");
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.category(), "process");
    }

    #[test]
    fn signal_failure_message() {
        let err = PipelineError::ProcessFailed {
            command: "sleep 10".into(),
            code: None,
        };
        assert!(err.to_string().ends_with("(terminated by signal)"));
    }

    #[test]
    fn error_kinds_render_messages() {
        assert_eq!(SyntaxError::UnmatchedOpen.to_string(), "expected '}' before end of template");
        assert_eq!(
            SyntaxError::UnknownConversion('r').to_string(),
            "unknown conversion specifier 'r'"
        );
        assert_eq!(UsageError::MissingPositional(2).to_string(), "no positional value at index 2");
        let err = TemplateError::Usage {
            template: "{k}".into(),
            offset: 0,
            kind: UsageError::MissingKey("k".into()),
        };
        assert_eq!(
            err.to_string(),
            r#"template usage error at offset 0 in "{k}": no named value "k""#
        );
    }

    #[test]
    fn template_error_categories() {
        let syntax = TemplateError::Syntax {
            template: "{".into(),
            offset: 0,
            kind: SyntaxError::UnmatchedOpen,
        };
        let usage = TemplateError::Usage {
            template: "{} {0}".into(),
            offset: 3,
            kind: UsageError::MixedNumbering,
        };
        assert_eq!(syntax.category(), "syntax");
        assert_eq!(usage.category(), "usage");
        assert_eq!(usage.offset(), 3);
        assert_eq!(PipelineError::from(usage).category(), "usage");
    }
}
