//! Findings emitted by rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ExError, RtkError};

/// Ordered severity scale, least to most severe
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(RtkError::InvalidConfigValue {
                key: "severity".to_string(),
                reason: format!("unknown severity {:?}", other),
            }
            .into()),
        }
    }
}

/// What a rule instance reports; the engine stamps provenance onto it
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub message: String,
    pub data: Value,
    /// `None` falls back to [`Finding::DEFAULT_SEVERITY`]
    pub severity: Option<Severity>,
}

impl Finding {
    pub const DEFAULT_SEVERITY: Severity = Severity::Error;

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Value::Null,
            severity: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A finding attributed to a rule and a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub data: Value,
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Message {
    pub fn from_finding(finding: Finding, rule_id: &str, filename: Option<&str>) -> Self {
        Self {
            severity: finding.severity.unwrap_or(Finding::DEFAULT_SEVERITY),
            message: finding.message,
            data: finding.data,
            rule_id: rule_id.to_string(),
            filename: filename.map(str::to_string),
        }
    }

    /// Error-severity message standing in for a failed rule
    pub fn from_error(err: &ExError, rule_id: &str, filename: Option<&str>) -> Self {
        let mut data = serde_json::Map::new();
        data.insert("code".into(), Value::String(err.code().to_string()));
        if let Some(path) = err.path() {
            data.insert("path".into(), Value::String(path.to_string()));
        }
        let text = if err.message().is_empty() {
            err.code().to_string()
        } else {
            err.message().to_string()
        };
        Self {
            severity: Severity::Error,
            message: text,
            data: Value::Object(data),
            rule_id: rule_id.to_string(),
            filename: filename.map(str::to_string),
        }
    }
}
