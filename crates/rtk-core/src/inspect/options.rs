use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::message::Severity;
use crate::rules::Options;

/// Default sort field: reports' dump time
pub const DEFAULT_SORT_FIELD: &str = "header.dumpEventTimestamp";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// What a rule instance is scoped to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InspectScope {
    /// Fresh instance per (report, rule); `complete()` after each report
    #[default]
    PerReport,
    /// One instance per rule for the whole call; each report is a context
    Aggregate,
}

/// What happens when a rule fails on a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Emit an error-severity message in place of the rule's output
    #[default]
    Degrade,
    /// Yield the error, then carry on with the next rule
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectOptions {
    /// Messages below this severity are dropped
    pub severity: Severity,
    pub sort: bool,
    /// Dotted path into the message, falling back to its report
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub show_secrets_unsafe: bool,
    /// Per-rule options; naming a rule here also enables it
    pub rule_config: BTreeMap<String, Options>,
    pub scope: InspectScope,
    pub error_policy: ErrorPolicy,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            severity: Severity::Info,
            sort: false,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Asc,
            show_secrets_unsafe: false,
            rule_config: BTreeMap::new(),
            scope: InspectScope::PerReport,
            error_policy: ErrorPolicy::Degrade,
        }
    }
}

impl InspectOptions {
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = true;
        self.sort_field = field.into();
        self.sort_direction = direction;
        self
    }

    pub fn with_rule_config(mut self, rule_id: impl Into<String>, options: Options) -> Self {
        self.rule_config.insert(rule_id.into(), options);
        self
    }

    pub fn with_scope(mut self, scope: InspectScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
