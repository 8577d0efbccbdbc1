//! JSON request handling for the `shpipe` binary.
//!
//! A request either expands a template into words:
//!
//! ```json
//! {"words": {"template": "git log {rev}", "kwargs": {"rev": "HEAD~2"}}}
//! ```
//!
//! or builds and runs a pipeline of registered operations:
//!
//! ```json
//! {"pipeline": [{"op": "run", "args": ["ls {}", "/"]}, {"op": "splitlines"}], "mode": "values"}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::filter::{OperationRegistry, Outcome, Stage, slurp, to_stdout};
use crate::words::{Value, split_words};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    #[serde(default)]
    pub words: Option<WordsRequest>,
    #[serde(default)]
    pub pipeline: Option<Vec<Stage>>,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WordsRequest {
    pub template: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

/// What to do with a pipeline's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Capture it, trailing newlines stripped, as a string.
    #[default]
    Slurp,
    /// Copy it to standard output as it is produced.
    Stdout,
    /// Collect an iterator or value result.
    Values,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Words {
        words: Vec<String>,
    },
    Output {
        output: String,
    },
    Values {
        values: Vec<Value>,
    },
    Value {
        value: Value,
    },
    /// Output already went to stdout; nothing more to print.
    #[serde(skip)]
    Streamed,
    Error {
        error: String,
        kind: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl From<PipelineError> for Response {
    fn from(e: PipelineError) -> Self {
        Response::Error {
            kind: e.category(),
            exit_code: e.exit_code(),
            error: e.to_string(),
        }
    }
}

/// Byte records are shown as text in JSON responses.
fn displayable(value: Value) -> Value {
    match value {
        Value::Bytes(b) => Value::Str(String::from_utf8_lossy(&b).into_owned()),
        Value::List(items) => Value::List(items.into_iter().map(displayable).collect()),
        other => other,
    }
}

/// Execute a parsed request.
pub fn handle(request: Request, registry: &OperationRegistry) -> Result<Response, PipelineError> {
    match (request.words, request.pipeline) {
        (Some(words), None) => {
            let words = split_words(&words.template, &words.args, &words.kwargs)?;
            Ok(Response::Words { words })
        }
        (None, Some(stages)) => {
            log::debug!("building pipeline of {} stages", stages.len());
            let pipeline = registry.build(stages)?;
            log::info!("running {} ({:?})", pipeline.label(), request.mode);
            match request.mode {
                Mode::Slurp => {
                    let bytes = slurp(&pipeline)?;
                    Ok(Response::Output {
                        output: String::from_utf8_lossy(&bytes).into_owned(),
                    })
                }
                Mode::Stdout => {
                    to_stdout(&pipeline)?;
                    Ok(Response::Streamed)
                }
                Mode::Values => match pipeline.invoke()? {
                    Outcome::Values(values) => Ok(Response::Values {
                        values: values
                            .map(|v| v.map(displayable))
                            .collect::<Result<_, _>>()?,
                    }),
                    Outcome::Value(value) => Ok(Response::Value {
                        value: displayable(value),
                    }),
                    _ => Err(PipelineError::WrongOutput {
                        filter: pipeline.label().to_string(),
                        kind: pipeline.output().kind,
                        wanted: "collected as values",
                    }),
                },
            }
        }
        _ => Err(PipelineError::Arguments {
            op: "request".into(),
            message: "expected exactly one of \"words\" or \"pipeline\"".into(),
        }),
    }
}

/// Parse and execute a raw JSON request, folding every failure into a response.
pub fn respond(input: &str, registry: &OperationRegistry) -> Response {
    let request: Request = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => {
            return Response::Error {
                error: format!("invalid request: {e}"),
                kind: "request",
                exit_code: None,
            };
        }
    };
    match handle(request, registry) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("request failed: {e}");
            e.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn respond_to(input: &str) -> Response {
        respond(input, &OperationRegistry::from_config(&Config::default_config()))
    }

    #[test]
    fn words_request() {
        let response = respond_to(
            r#"{"words": {"template": "tar -C {dir} -xzf {}", "args": ["a b.tgz"], "kwargs": {"dir": "/srv/x y"}}}"#,
        );
        assert_eq!(
            response,
            Response::Words {
                words: vec![
                    "tar".into(),
                    "-C".into(),
                    "/srv/x y".into(),
                    "-xzf".into(),
                    "a b.tgz".into()
                ]
            }
        );
    }

    #[test]
    fn template_error_kind() {
        let response = respond_to(r#"{"words": {"template": "{} {0}", "args": [1, 2]}}"#);
        let Response::Error { kind, .. } = response else {
            panic!("expected an error");
        };
        assert_eq!(kind, "usage");
    }

    #[test]
    fn slurp_pipeline() {
        let response = respond_to(
            r#"{"pipeline": [{"op": "echo", "args": ["hello"]}, {"op": "run", "args": ["tr h H"]}]}"#,
        );
        assert_eq!(
            response,
            Response::Output {
                output: "Hello".into()
            }
        );
    }

    #[test]
    fn values_pipeline() {
        let response = respond_to(
            r#"{"pipeline": [{"op": "echo", "args": ["a\nb"]}, {"op": "splitlines"}], "mode": "values"}"#,
        );
        assert_eq!(
            response,
            Response::Values {
                values: vec![Value::from("a"), Value::from("b")]
            }
        );

        let response = respond_to(
            r#"{"pipeline": [{"op": "echo", "args": ["a\nb"]}, {"op": "splitlines"}, {"op": "count"}], "mode": "values"}"#,
        );
        assert_eq!(response, Response::Value { value: Value::Int(2) });
    }

    #[test]
    fn process_failure_carries_exit_code() {
        let response = respond_to(r#"{"pipeline": [{"op": "run", "args": ["sh -c {}", "exit 4"]}]}"#);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "process");
        assert_eq!(json["exit_code"], 4);
    }

    #[test]
    fn malformed_requests() {
        for input in [
            "not json",
            "{}",
            r#"{"words": {"template": "x"}, "pipeline": []}"#,
            r#"{"pipeline": [], "mode": "loud"}"#,
        ] {
            assert!(respond_to(input).is_error(), "{input}");
        }
    }

    #[test]
    fn values_mode_needs_collectable_output() {
        let response = respond_to(r#"{"pipeline": [{"op": "echo"}], "mode": "values"}"#);
        assert!(response.is_error());
    }

    #[test]
    fn responses_serialize_flat() {
        let json = serde_json::to_string(&Response::Words {
            words: vec!["ls".into()],
        })
        .unwrap();
        assert_eq!(json, r#"{"words":["ls"]}"#);
    }
}
