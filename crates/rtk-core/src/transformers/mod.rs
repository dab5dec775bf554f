//! Built-in transformers of the `report-toolkit` plugin.

pub mod csv;
pub mod filter;
pub mod json;
pub mod newline;
pub mod numeric;
pub mod redact;
pub mod stack_hash;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::path;
use crate::transform::Transformer;

/// All built-in transformers, in listing order
pub fn builtin() -> Vec<Arc<dyn Transformer>> {
    vec![
        Arc::new(csv::Csv),
        Arc::new(filter::Filter),
        Arc::new(json::Json),
        Arc::new(newline::Newline),
        Arc::new(numeric::Numeric),
        Arc::new(redact::Redact),
        Arc::new(stack_hash::StackHash),
    ]
}

/// A single string or a list of strings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Flatten nested objects and arrays into dotted-path leaves, in tree order
pub(crate) fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, &path::join(prefix, key), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, &path::join_index(prefix, i), out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}
