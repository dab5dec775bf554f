//! Rule contract.
//!
//! A [`RuleDefinition`] is registered once and shared; each inspection asks
//! it for a fresh [`RuleInstance`], feeds that instance report contexts via
//! `next`, then calls `complete` exactly once. Instances may accumulate
//! private state between calls; it dies with the instance.

pub mod cpu_usage;
pub mod library_mismatch;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{Result, RtkError};
use crate::message::Finding;
use crate::report::Report;

pub use cpu_usage::CpuUsage;
pub use library_mismatch::LibraryMismatch;

/// Rule or transformer options as given in config
pub type Options = serde_json::Map<String, Value>;

/// Human-facing documentation for a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDocs {
    pub category: String,
    pub description: String,
    pub url: Option<String>,
}

/// Static description of a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMeta {
    pub docs: RuleDocs,
    /// JSON schema of the accepted options (informational)
    pub schema: Value,
    pub constants: BTreeMap<String, Value>,
}

/// A registered rule
pub trait RuleDefinition: Send + Sync {
    fn id(&self) -> &str;

    fn meta(&self) -> &RuleMeta;

    /// Create a fresh instance for one inspection scope
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` if `options` are rejected.
    fn inspect(&self, options: &Options) -> Result<Box<dyn RuleInstance>>;
}

/// One stateful execution of a rule
pub trait RuleInstance {
    /// Consume one context; may produce one finding
    ///
    /// # Errors
    ///
    /// A failure aborts this instance's remaining work for the current scope.
    fn next(&mut self, context: &Report) -> Result<Option<Finding>>;

    /// Called once after the last context
    ///
    /// # Errors
    ///
    /// Same as [`RuleInstance::next`].
    fn complete(&mut self) -> Result<Option<Finding>> {
        Ok(None)
    }
}

/// Deserialize a rule's typed options
///
/// # Errors
///
/// Returns `InvalidRuleOptions` (kind `ConfigValidation`) naming the rule.
pub fn parse_options<T: DeserializeOwned>(rule_id: &str, options: &Options) -> Result<T> {
    serde_json::from_value(Value::Object(options.clone())).map_err(|e| {
        RtkError::InvalidRuleOptions {
            rule_id: rule_id.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
