//! The closed value type substituted into templates and passed between filters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A template or pipeline value.
///
/// Deserializes from plain JSON (`"a"`, `1`, `1.5`, `true`, `[...]`, `{...}`).
/// `Bytes` is never produced by deserialization; JSON arrays of numbers
/// become `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bytes(Vec<u8>),
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Bytes(_) => "bytes",
        }
    }

    /// `.name` access: map key lookup.
    pub fn attr(&self, name: &str) -> Result<&Value, String> {
        match self {
            Value::Map(m) => m
                .get(name)
                .ok_or_else(|| format!("map has no key {name:?}")),
            other => Err(format!(
                "cannot access attribute .{name} on a {}",
                other.type_name()
            )),
        }
    }

    /// `[key]` access: list index when `key` is all digits, map key otherwise.
    pub fn index(&self, key: &str) -> Result<&Value, String> {
        let numeric = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
        match self {
            Value::List(items) if numeric => {
                let i: usize = key
                    .parse()
                    .map_err(|_| format!("index [{key}] is too large"))?;
                items
                    .get(i)
                    .ok_or_else(|| format!("index [{i}] out of range for list of {}", items.len()))
            }
            Value::List(_) => Err(format!("list index must be an integer, got [{key}]")),
            Value::Map(m) => m.get(key).ok_or_else(|| format!("map has no key [{key}]")),
            other => Err(format!("cannot index a {} with [{key}]", other.type_name())),
        }
    }

    /// Raw bytes of a `Str` or `Bytes` value; other values use their display form.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(b) => b.clone(),
            Value::Str(s) => s.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::List(_) | Value::Map(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<&std::path::Path> for Value {
    fn from(p: &std::path::Path) -> Self {
        Value::Str(p.to_string_lossy().into_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
