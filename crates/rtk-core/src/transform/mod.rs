//! Transformer contract and item types.
//!
//! A [`Transformer`] declares the [`ItemType`] it consumes and produces and,
//! given options, builds a fresh [`Stage`] for one chain execution. Stages
//! may buffer: `process` returns zero or more items per input and `finish`
//! flushes whatever is left once upstream ends.

pub mod chain;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, RtkError};
use crate::report::Report;
use crate::rules::Options;

pub use chain::{ChainRun, TransformOptions, TransformerChain};

/// Declared type tag of a stage's input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Report,
    Object,
    String,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Report => "report",
            ItemType::Object => "object",
            ItemType::String => "string",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value flowing between stages
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Report(Report),
    Object(Value),
    String(String),
}

impl Item {
    pub fn item_type(&self) -> ItemType {
        match self {
            Item::Report(_) => ItemType::Report,
            Item::Object(_) => ItemType::Object,
            Item::String(_) => ItemType::String,
        }
    }

    /// Object view of the item; a report is its root tree
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedItem` for string items.
    pub fn into_object(self, transformer_id: &str) -> Result<Value> {
        match self {
            Item::Report(report) => Ok(report.root().clone()),
            Item::Object(value) => Ok(value),
            other @ Item::String(_) => Err(unexpected(transformer_id, ItemType::Object, &other)),
        }
    }

    /// # Errors
    ///
    /// Returns `UnexpectedItem` unless the item is a report.
    pub fn into_report(self, transformer_id: &str) -> Result<Report> {
        match self {
            Item::Report(report) => Ok(report),
            other => Err(unexpected(transformer_id, ItemType::Report, &other)),
        }
    }

    /// # Errors
    ///
    /// Returns `UnexpectedItem` unless the item is a string.
    pub fn into_string(self, transformer_id: &str) -> Result<String> {
        match self {
            Item::String(text) => Ok(text),
            other => Err(unexpected(transformer_id, ItemType::String, &other)),
        }
    }

    /// JSON rendering of any item
    pub fn to_value(&self) -> Value {
        match self {
            Item::Report(report) => report.root().clone(),
            Item::Object(value) => value.clone(),
            Item::String(text) => Value::String(text.clone()),
        }
    }
}

fn unexpected(transformer_id: &str, expected: ItemType, item: &Item) -> crate::errors::ExError {
    RtkError::UnexpectedItem {
        transformer_id: transformer_id.to_string(),
        expected: expected.to_string(),
        actual: item.item_type().to_string(),
    }
    .into()
}

/// A registered converter
pub trait Transformer: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn input_type(&self) -> ItemType;

    fn output_type(&self) -> ItemType;

    /// Build a fresh stage for one execution
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` if `options` are rejected.
    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>>;
}

/// Execution-scoped state of one transformer in one chain run
pub trait Stage {
    /// # Errors
    ///
    /// A failure aborts the rest of the chain run.
    fn process(&mut self, item: Item) -> Result<Vec<Item>>;

    /// # Errors
    ///
    /// Same as [`Stage::process`].
    fn finish(&mut self) -> Result<Vec<Item>> {
        Ok(Vec::new())
    }
}

/// Deserialize a transformer's typed options
///
/// # Errors
///
/// Returns `InvalidTransformerOptions` (kind `ConfigValidation`).
pub fn parse_options<T: serde::de::DeserializeOwned>(
    transformer_id: &str,
    options: &Options,
) -> Result<T> {
    serde_json::from_value(Value::Object(options.clone())).map_err(|e| {
        RtkError::InvalidTransformerOptions {
            transformer_id: transformer_id.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
