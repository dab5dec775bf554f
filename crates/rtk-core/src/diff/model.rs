//! Diff output types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nesting limit of the walk; deeper trees fail the diff
pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Add,
    Remove,
    Replace,
}

impl DiffOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffOp::Add => "add",
            DiffOp::Remove => "remove",
            DiffOp::Replace => "replace",
        }
    }
}

impl fmt::Display for DiffOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One difference between two reports
///
/// `old_value` is `None` for `add`, `new_value` is `None` for `remove`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub op: DiffOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl DiffResult {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: DiffOp::Add,
            path: path.into(),
            old_value: None,
            new_value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: DiffOp::Remove,
            path: path.into(),
            old_value: Some(value),
            new_value: None,
        }
    }

    pub fn replace(path: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            op: DiffOp::Replace,
            path: path.into(),
            old_value: Some(old),
            new_value: Some(new),
        }
    }

    /// The same difference seen from the other side
    pub fn mirrored(&self) -> Self {
        Self {
            op: match self.op {
                DiffOp::Add => DiffOp::Remove,
                DiffOp::Remove => DiffOp::Add,
                DiffOp::Replace => DiffOp::Replace,
            },
            path: self.path.clone(),
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOptions {
    /// Paths or property names never visited
    #[serde(default)]
    pub filter_properties: Vec<String>,
    /// Diff unredacted reports as given; otherwise both sides are redacted first
    #[serde(default)]
    pub show_secrets_unsafe: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            filter_properties: Vec::new(),
            show_secrets_unsafe: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DiffOptions {
    pub fn filter<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_properties = properties.into_iter().map(Into::into).collect();
        self
    }
}
