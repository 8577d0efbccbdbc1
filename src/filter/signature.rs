//! Operation descriptors and argument binding.
//!
//! Every built-in is an [`Operation`] with a static [`Signature`]. Binding
//! checks call arguments against the signature once, up front, so a pipeline
//! that builds is a pipeline whose stages all got arguments they understand.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::stream::MAX_CHUNK_SIZE;
use super::{Endpoint, Filter, Input, Output, Produced};
use crate::error::PipelineError;
use crate::words::Value;

/// Accepted shape of one argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Any,
    /// A string.
    Text,
    /// A string or raw bytes.
    Bytes,
    Bool,
    /// A non-negative integer.
    Count,
    /// A read size in `1..=MAX_CHUNK_SIZE`.
    ChunkSize,
}

impl ParamKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::Any => true,
            ParamKind::Text => matches!(value, Value::Str(_)),
            ParamKind::Bytes => matches!(value, Value::Str(_) | Value::Bytes(_)),
            ParamKind::Bool => matches!(value, Value::Bool(_)),
            ParamKind::Count => matches!(value, Value::Int(i) if *i >= 0),
            ParamKind::ChunkSize => matches!(
                value,
                Value::Int(i) if usize::try_from(*i).is_ok_and(|n| (1..=MAX_CHUNK_SIZE).contains(&n))
            ),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ParamKind::Any => "any value",
            ParamKind::Text => "a string",
            ParamKind::Bytes => "a string or bytes",
            ParamKind::Bool => "a bool",
            ParamKind::Count => "a non-negative int",
            ParamKind::ChunkSize => "an int from 1 to 1048576",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Optional,
    /// Zero or more; only valid as the last positional parameter.
    Variadic,
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub arity: Arity,
}

impl Param {
    pub const fn one(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            arity: Arity::One,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            arity: Arity::Optional,
        }
    }

    pub const fn variadic(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            arity: Arity::Variadic,
        }
    }
}

/// Immutable description of an operation: endpoints and accepted arguments.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub input: Endpoint,
    pub output: Endpoint,
    pub positional: &'static [Param],
    pub keywords: &'static [Param],
    /// Accept keyword arguments not listed in `keywords`. Names starting
    /// with `_` are reserved for options and are never accepted this way.
    pub extra_keywords: bool,
}

impl Signature {
    /// Whether `name` is a declared keyword parameter.
    pub fn has_keyword(&self, name: &str) -> bool {
        self.keywords.iter().any(|p| p.name == name)
    }

    /// Validate `args` for the operation `op`.
    pub fn check(&self, op: &str, args: &Args) -> Result<(), PipelineError> {
        let fail = |message: String| PipelineError::Arguments {
            op: op.to_string(),
            message,
        };
        let wrong_type = |name: &str, kind: ParamKind, value: &Value| {
            fail(format!(
                "argument {name} must be {}, got {}",
                kind.describe(),
                value.type_name()
            ))
        };

        let given = &args.positional;
        let mut next = 0;
        for param in self.positional {
            match param.arity {
                Arity::One => {
                    let Some(value) = given.get(next) else {
                        return Err(fail(format!("missing argument {}", param.name)));
                    };
                    if !param.kind.accepts(value) {
                        return Err(wrong_type(param.name, param.kind, value));
                    }
                    next += 1;
                }
                Arity::Optional => {
                    if let Some(value) = given.get(next) {
                        if !param.kind.accepts(value) {
                            return Err(wrong_type(param.name, param.kind, value));
                        }
                        next += 1;
                    }
                }
                Arity::Variadic => {
                    for value in &given[next.min(given.len())..] {
                        if !param.kind.accepts(value) {
                            return Err(wrong_type(param.name, param.kind, value));
                        }
                    }
                    next = given.len();
                }
            }
        }
        if next < given.len() {
            return Err(fail(format!(
                "takes at most {next} positional arguments, got {}",
                given.len()
            )));
        }

        for (name, value) in &args.named {
            match self.keywords.iter().find(|p| p.name == name) {
                Some(param) if !param.kind.accepts(value) => {
                    return Err(wrong_type(name, param.kind, value));
                }
                Some(_) => {}
                None if self.extra_keywords && !name.starts_with('_') => {}
                None => return Err(fail(format!("unexpected keyword argument {name}"))),
            }
        }
        Ok(())
    }
}

/// Call arguments: positional values plus named values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    #[serde(default)]
    pub positional: Vec<Value>,
    #[serde(default)]
    pub named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a named value.
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Set a named value only if the caller did not.
    pub fn with_default(mut self, key: &str, value: &Value) -> Self {
        if !self.named.contains_key(key) {
            self.named.insert(key.to_string(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// A `Count` argument as `usize`, falling back to `default` when absent.
    pub fn count_or(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(Value::as_int)
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(default)
    }

    /// Named values that are not `_`-prefixed options.
    pub fn template_values(&self) -> BTreeMap<String, Value> {
        self.named
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// A named, signature-described body from which filters are bound.
pub trait Operation: Send + Sync {
    fn name(&self) -> &'static str;

    fn signature(&self) -> &'static Signature;

    /// Do the work. Handles have already been checked against the signature's
    /// endpoints and `args` against its parameters.
    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError>;
}

/// Validate `args` and bind them to `op`, yielding a filter.
pub fn bind(op: Arc<dyn Operation>, args: Args) -> Result<Filter, PipelineError> {
    op.signature().check(op.name(), &args)?;
    Ok(bound(op, args))
}

/// Bind without validation, for constructors whose arguments are correct by type.
pub(crate) fn bound(op: Arc<dyn Operation>, args: Args) -> Filter {
    let signature = op.signature();
    let label = describe(op.name(), &args);
    Filter::new(
        label,
        signature.input,
        signature.output,
        move |input, output| op.run(input, output, &args),
    )
}

/// Render `name(arg, ..., key=value)` for labels and logs.
fn describe(name: &str, args: &Args) -> String {
    let render = |v: &Value| match v {
        Value::Bytes(b) => format!("b{:?}", String::from_utf8_lossy(b)),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    };
    let parts: Vec<String> = args
        .positional
        .iter()
        .map(render)
        .chain(args.named.iter().map(|(k, v)| format!("{k}={}", render(v))))
        .collect();
    format!("{name}({})", parts.join(", "))
}
