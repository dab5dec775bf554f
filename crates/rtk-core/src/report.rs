//! Immutable diagnostic report trees.
//!
//! A [`Report`] wraps one parsed diagnostic snapshot. Secrets are redacted
//! when the report is built unless the caller explicitly opts out with
//! `show_secrets_unsafe`; after construction the tree is frozen behind an
//! `Arc` and shared by every engine that reads it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::{RtkError, Result};
use crate::path;

/// Placeholder written over redacted values
pub const REDACTED: &str = "[REDACTED]";

static SECRET_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(passw(or)?d|secret|token|api[-_]?key|auth|credential|private|session|cookie)")
        .expect("secret key regex must compile")
});

/// Options for building a report from raw input
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Keep secret-bearing values as-is
    pub show_secrets_unsafe: bool,
    /// Where the report came from, carried into messages
    pub filename: Option<String>,
}

impl ReportOptions {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn unsafe_show_secrets(mut self, show: bool) -> Self {
        self.show_secrets_unsafe = show;
        self
    }
}

/// One diagnostic snapshot
///
/// Cloning is cheap: clones share the same tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    root: Arc<Value>,
    filename: Option<String>,
    redacted: bool,
}

impl Report {
    /// Build a report from an already-parsed JSON value
    ///
    /// # Errors
    ///
    /// Returns `InvalidReport` if the value is not a JSON object.
    pub fn from_value(mut value: Value, options: &ReportOptions) -> Result<Self> {
        if !value.is_object() {
            return Err(RtkError::InvalidReport {
                reason: format!(
                    "expected a JSON object{}",
                    options
                        .filename
                        .as_deref()
                        .map(|f| format!(" in {}", f))
                        .unwrap_or_default()
                ),
            }
            .into());
        }
        let redacted = !options.show_secrets_unsafe;
        if redacted {
            redact_in_place(&mut value);
        }
        Ok(Self {
            root: Arc::new(value),
            filename: options.filename.clone(),
            redacted,
        })
    }

    /// Parse and build a report from JSON text
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON and `InvalidReport` for a
    /// non-object root.
    pub fn from_json_str(text: &str, options: &ReportOptions) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, options)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a dotted path inside the report
    pub fn get(&self, path: &str) -> Option<&Value> {
        path::lookup(&self.root, path)
    }

    /// Resolve a dotted path that a caller cannot do without
    ///
    /// # Errors
    ///
    /// Returns `MissingProperty` naming the path and the report's file.
    pub fn require(&self, path: &str) -> Result<&Value> {
        self.get(path).ok_or_else(|| {
            RtkError::MissingProperty {
                path: path.to_string(),
                filename: self.display_name().to_string(),
            }
            .into()
        })
    }

    pub fn header(&self) -> Option<&Value> {
        self.get("header")
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Filename, or a placeholder for reports built from in-memory values
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("(anonymous)")
    }

    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    /// A redacted copy of this report; returns a shared clone if already redacted
    pub fn to_redacted(&self) -> Report {
        if self.redacted {
            return self.clone();
        }
        let mut value = (*self.root).clone();
        redact_in_place(&mut value);
        Report {
            root: Arc::new(value),
            filename: self.filename.clone(),
            redacted: true,
        }
    }
}

/// Whether a property name looks like it holds a secret
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEY.is_match(key)
}

/// Replace every scalar stored under a secret-looking key; returns the count
///
/// A secret-looking key covers its whole subtree: every scalar inside an
/// array or object stored under it is replaced too.
pub fn redact_in_place(value: &mut Value) -> usize {
    redact_subtree(value, false)
}

fn redact_subtree(value: &mut Value, secret: bool) -> usize {
    match value {
        Value::Object(map) => map
            .iter_mut()
            .map(|(key, child)| redact_subtree(child, secret || is_secret_key(key)))
            .sum(),
        Value::Array(items) => items.iter_mut().map(|item| redact_subtree(item, secret)).sum(),
        Value::String(_) | Value::Number(_) | Value::Bool(_) if secret => {
            *value = Value::String(REDACTED.to_string());
            1
        }
        _ => 0,
    }
}
