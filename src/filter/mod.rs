//! Typed filter units and their composition into pipelines.
//!
//! A [`Filter`] has an input and an output [`Endpoint`], each tagged with a
//! [`Kind`], and a thunk that does the work. `left | right` composes two
//! filters when `left`'s output kind equals `right`'s input kind.
//!
//! Byte and text stages run one at a time: the left stage's whole output is
//! buffered in memory and then handed to the right stage. This keeps
//! composition simple and deterministic, but a pipeline moving many
//! gigabytes will hold all of it in memory at once. Iterator stages are lazy
//! and pull-driven.

pub mod exec;
pub mod registry;
pub mod signature;
pub mod stream;

pub use exec::{slurp, slurp_text, strip_trailing_newlines, to_stdout};
pub use registry::{OperationRegistry, Stage};
pub use signature::{Args, Arity, Operation, Param, ParamKind, Signature, bind};

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::ops::BitOr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::words::Value;

// ── Endpoint kinds ──

/// Shape of data crossing a filter endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Nothing flows.
    None,
    /// A byte stream.
    Stream,
    /// A UTF-8 text stream.
    Text,
    /// A lazy, single-pass sequence of values.
    Iter,
    /// One value.
    Value,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::None => "none",
            Kind::Stream => "stream",
            Kind::Text => "text",
            Kind::Iter => "iter",
            Kind::Value => "value",
        }
    }

    /// Stream and text endpoints exchange live handles; the others exchange values.
    pub fn is_handle(self) -> bool {
        matches!(self, Kind::Stream | Kind::Text)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a filter: its kind and whether it must be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: Kind,
    /// An optional endpoint may be left unconnected when the filter is invoked.
    pub required: bool,
}

impl Endpoint {
    pub const NONE: Endpoint = Endpoint {
        kind: Kind::None,
        required: false,
    };

    pub const fn required(kind: Kind) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    pub const fn optional(kind: Kind) -> Self {
        Self {
            kind,
            required: false,
        }
    }

    /// Whether the endpoint can be left unconnected.
    pub fn may_be_absent(&self) -> bool {
        self.kind == Kind::None || !self.required
    }
}

// ── Handles passed to thunks ──

/// Owned byte source handed to a stream or text stage.
pub type Reader = Box<dyn Read + Send>;

/// Lazy output of an iterator stage.
pub type ValueIter = Box<dyn Iterator<Item = Result<Value, PipelineError>> + Send>;

/// What a thunk receives on its input side.
pub enum Input {
    None,
    Stream(Reader),
    Text(Reader),
    Iter(ValueIter),
    Value(Value),
}

impl Input {
    /// Wrap any reader as a byte-stream input.
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Input::Stream(Box::new(reader))
    }

    /// Wrap any reader producing UTF-8 as a text input.
    pub fn text(reader: impl Read + Send + 'static) -> Self {
        Input::Text(Box::new(reader))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Input::None => Kind::None,
            Input::Stream(_) => Kind::Stream,
            Input::Text(_) => Kind::Text,
            Input::Iter(_) => Kind::Iter,
            Input::Value(_) => Kind::Value,
        }
    }

    /// The reader behind a stream or text input.
    pub fn into_reader(self) -> Option<Reader> {
        match self {
            Input::Stream(r) | Input::Text(r) => Some(r),
            _ => None,
        }
    }
}

/// What a thunk writes to on its output side. Iterator and value stages
/// always get `Output::None` and return their result instead.
pub enum Output<'a> {
    None,
    Stream(&'a mut dyn Write),
    Text(&'a mut dyn Write),
}

impl<'a> Output<'a> {
    pub fn kind(&self) -> Kind {
        match self {
            Output::None => Kind::None,
            Output::Stream(_) => Kind::Stream,
            Output::Text(_) => Kind::Text,
        }
    }

    /// The writer behind a stream or text output.
    pub fn writer(self) -> Option<&'a mut dyn Write> {
        match self {
            Output::Stream(w) | Output::Text(w) => Some(w),
            Output::None => None,
        }
    }
}

/// What a thunk returns.
pub enum Produced {
    /// Everything went to the output handle (or there was no output).
    Done,
    Iter(ValueIter),
    Value(Value),
}

impl fmt::Debug for Produced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Produced::Done => f.write_str("Done"),
            Produced::Iter(_) => f.write_str("Iter(..)"),
            Produced::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Result of [`Filter::invoke`], shaped by the filter's output kind.
pub enum Outcome {
    Empty,
    Bytes(Vec<u8>),
    Text(String),
    Values(ValueIter),
    Value(Value),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Empty => f.write_str("Empty"),
            Outcome::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Outcome::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Outcome::Values(_) => f.write_str("Values(..)"),
            Outcome::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

// ── Filter ──

type Thunk = Arc<dyn Fn(Input, Output<'_>) -> Result<Produced, PipelineError> + Send + Sync>;

/// An immutable, composable pipeline stage.
#[derive(Clone)]
pub struct Filter {
    input: Endpoint,
    output: Endpoint,
    label: Arc<str>,
    thunk: Thunk,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("label", &self.label)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl Filter {
    /// Build a filter from endpoints and a thunk.
    ///
    /// The thunk only ever sees handles matching the endpoints; [`Filter::call`]
    /// checks them before it runs.
    pub fn new<F>(label: impl Into<String>, input: Endpoint, output: Endpoint, thunk: F) -> Self
    where
        F: Fn(Input, Output<'_>) -> Result<Produced, PipelineError> + Send + Sync + 'static,
    {
        Self {
            input,
            output,
            label: Arc::from(label.into()),
            thunk: Arc::new(thunk),
        }
    }

    pub fn input(&self) -> Endpoint {
        self.input
    }

    pub fn output(&self) -> Endpoint {
        self.output
    }

    /// Human-readable description, e.g. `echo("hello") | run("tr h H")`.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn mismatch(&self, side: &'static str, expected: Kind) -> PipelineError {
        PipelineError::HandleMismatch {
            filter: self.label.to_string(),
            side,
            expected,
        }
    }

    /// Run the thunk against explicit handles.
    pub fn call(&self, input: Input, output: Output<'_>) -> Result<Produced, PipelineError> {
        let input_ok = match input.kind() {
            Kind::None => self.input.may_be_absent(),
            kind => kind == self.input.kind,
        };
        if !input_ok {
            return Err(self.mismatch("input handle", self.input.kind));
        }

        let output_ok = match output.kind() {
            Kind::None => !self.output.kind.is_handle() || !self.output.required,
            kind => kind == self.output.kind,
        };
        if !output_ok {
            return Err(self.mismatch("output handle", self.output.kind));
        }

        let produced = (self.thunk)(input, output)?;
        let produced_ok = match (&produced, self.output.kind) {
            (Produced::Iter(_), Kind::Iter) | (Produced::Value(_), Kind::Value) => true,
            (Produced::Done, kind) => !matches!(kind, Kind::Iter | Kind::Value),
            _ => false,
        };
        if !produced_ok {
            return Err(self.mismatch("result", self.output.kind));
        }
        Ok(produced)
    }

    fn ensure_standalone(&self) -> Result<(), PipelineError> {
        if self.input.may_be_absent() {
            Ok(())
        } else {
            Err(PipelineError::Unsatisfiable {
                filter: self.label.to_string(),
                kind: self.input.kind,
            })
        }
    }

    /// Run a filter that needs no external input, collecting its output.
    pub fn invoke(&self) -> Result<Outcome, PipelineError> {
        self.ensure_standalone()?;
        log::debug!("invoking {}", self.label);
        match self.output.kind {
            Kind::None => {
                self.call(Input::None, Output::None)?;
                Ok(Outcome::Empty)
            }
            Kind::Stream => {
                let mut buf = Vec::new();
                self.call(Input::None, Output::Stream(&mut buf))?;
                Ok(Outcome::Bytes(buf))
            }
            Kind::Text => {
                let mut buf = Vec::new();
                self.call(Input::None, Output::Text(&mut buf))?;
                let text = String::from_utf8(buf).map_err(|e| PipelineError::InvalidUtf8 {
                    position: e.utf8_error().valid_up_to(),
                })?;
                Ok(Outcome::Text(text))
            }
            Kind::Iter => match self.call(Input::None, Output::None)? {
                Produced::Iter(values) => Ok(Outcome::Values(values)),
                _ => Err(self.mismatch("result", Kind::Iter)),
            },
            Kind::Value => match self.call(Input::None, Output::None)? {
                Produced::Value(v) => Ok(Outcome::Value(v)),
                _ => Err(self.mismatch("result", Kind::Value)),
            },
        }
    }

    /// Lazily iterate the values of a filter with iterator output.
    ///
    /// Each call runs the filter afresh; the returned iterator itself is single-pass.
    pub fn iter(&self) -> Result<ValueIter, PipelineError> {
        if self.output.kind != Kind::Iter {
            return Err(PipelineError::WrongOutput {
                filter: self.label.to_string(),
                kind: self.output.kind,
                wanted: "iterated",
            });
        }
        match self.invoke()? {
            Outcome::Values(values) => Ok(values),
            _ => Err(self.mismatch("result", Kind::Iter)),
        }
    }

    /// Compose `self` with `right`, feeding `self`'s output into `right`'s input.
    pub fn pipe(&self, right: &Filter) -> Result<Filter, PipelineError> {
        let kind = self.output.kind;
        if kind != right.input.kind {
            return Err(PipelineError::KindMismatch {
                left: kind,
                right: right.input.kind,
            });
        }
        if kind == Kind::None {
            return Err(PipelineError::NoneEndpoint {
                filter: format!("{} | {}", self.label, right.label),
            });
        }

        let label = format!("{} | {}", self.label, right.label);
        let (input, output) = (self.input, right.output);
        let (left, right) = (self.clone(), right.clone());

        let piped = match kind {
            Kind::Stream | Kind::Text => {
                Filter::new(label, input, output, move |upstream, downstream| {
                    let mut buf = Vec::new();
                    let handle = if kind == Kind::Text {
                        Output::Text(&mut buf)
                    } else {
                        Output::Stream(&mut buf)
                    };
                    left.call(upstream, handle)?;
                    log::debug!("{} produced {} bytes", left.label, buf.len());
                    let reader: Reader = Box::new(Cursor::new(buf));
                    let next = if kind == Kind::Text {
                        Input::Text(reader)
                    } else {
                        Input::Stream(reader)
                    };
                    right.call(next, downstream)
                })
            }
            Kind::Iter => Filter::new(label, input, output, move |upstream, downstream| {
                match left.call(upstream, Output::None)? {
                    Produced::Iter(values) => right.call(Input::Iter(values), downstream),
                    _ => Err(left.mismatch("result", Kind::Iter)),
                }
            }),
            Kind::Value => Filter::new(label, input, output, move |upstream, downstream| {
                match left.call(upstream, Output::None)? {
                    Produced::Value(v) => right.call(Input::Value(v), downstream),
                    _ => Err(left.mismatch("result", Kind::Value)),
                }
            }),
            Kind::None => unreachable!("rejected above"),
        };
        Ok(piped)
    }
}

impl BitOr for Filter {
    type Output = Result<Filter, PipelineError>;

    fn bitor(self, right: Filter) -> Self::Output {
        self.pipe(&right)
    }
}

impl BitOr<Filter> for Result<Filter, PipelineError> {
    type Output = Result<Filter, PipelineError>;

    fn bitor(self, right: Filter) -> Self::Output {
        self?.pipe(&right)
    }
}
