//! Name → operation registry, used to build pipelines from data.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use super::stream::MAX_CHUNK_SIZE;
use super::{Args, Filter, Operation, bind};
use crate::commands;
use crate::config::Config;
use crate::error::PipelineError;
use crate::words::Value;

/// One stage of a pipeline described as data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stage {
    pub op: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

impl Stage {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// Registry of operations keyed by name, with per-operation default keywords.
pub struct OperationRegistry {
    ops: HashMap<&'static str, Arc<dyn Operation>>,
    defaults: HashMap<&'static str, BTreeMap<String, Value>>,
}

impl OperationRegistry {
    /// Every built-in, with no configured defaults.
    pub fn builtin() -> Self {
        let mut registry = Self {
            ops: HashMap::new(),
            defaults: HashMap::new(),
        };
        for op in commands::builtins() {
            registry.register(op);
        }
        registry
    }

    /// Every built-in, with defaults taken from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::builtin();

        let chunk_size = config.settings.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        let chunk_size = Value::Int(i64::try_from(chunk_size).unwrap_or(i64::MAX));
        let chunked: Vec<&'static str> = registry
            .ops
            .values()
            .filter(|op| op.signature().has_keyword("chunk_size"))
            .map(|op| op.name())
            .collect();
        for name in chunked {
            registry.set_default(name, "chunk_size", chunk_size.clone());
        }

        registry.set_default("run", "_check", Value::Bool(config.run.check));
        registry.set_default("run", "_stderr", Value::from(config.run.stderr.as_str()));
        registry
    }

    /// Add or replace an operation under its own name.
    pub fn register(&mut self, op: Arc<dyn Operation>) {
        self.ops.insert(op.name(), op);
    }

    /// Set a keyword default applied whenever `op` is bound by name.
    /// Ignored for unregistered operations.
    pub fn set_default(&mut self, op: &str, key: &str, value: Value) {
        if let Some(name) = self.ops.get(op).map(|o| o.name()) {
            self.defaults
                .entry(name)
                .or_default()
                .insert(key.to_string(), value);
        }
    }

    /// Look up an operation by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operation>> {
        self.ops.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Bind `args` to the operation `name`, filling in configured defaults.
    pub fn bind(&self, name: &str, args: Args) -> Result<Filter, PipelineError> {
        let op = self
            .get(name)
            .ok_or_else(|| PipelineError::UnknownOperation(name.to_string()))?;
        let args = match self.defaults.get(name) {
            Some(defaults) => defaults
                .iter()
                .fold(args, |args, (k, v)| args.with_default(k, v)),
            None => args,
        };
        bind(Arc::clone(op), args)
    }

    /// Bind every stage and compose them left to right.
    pub fn build<I>(&self, stages: I) -> Result<Filter, PipelineError>
    where
        I: IntoIterator<Item = Stage>,
    {
        let mut pipeline: Option<Filter> = None;
        for stage in stages {
            let filter = self.bind(
                &stage.op,
                Args {
                    positional: stage.args,
                    named: stage.kwargs,
                },
            )?;
            pipeline = Some(match pipeline {
                Some(left) => left.pipe(&filter)?,
                None => filter,
            });
        }
        pipeline.ok_or_else(|| PipelineError::Arguments {
            op: "pipeline".into(),
            message: "no stages given".into(),
        })
    }
}
