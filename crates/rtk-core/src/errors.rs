use rtk_core_types::RunId;
use thiserror::Error;

/// Result type alias using the canonical structured error
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing and machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Configuration / structure (fail before any item flows)
    /// Unknown rule/transformer/preset id, or options rejected by a rule/transformer
    ConfigValidation,
    /// Adjacent transformers disagree on item type
    ChainTypeMismatch,
    /// Plugin could not be resolved or registered
    PluginLoad,

    // Per-item
    /// A rule precondition was unmet on a given context
    MissingProperty,
    /// The diff walk hit a malformed tree
    DiffComparison,
    /// Raw input is not a usable report
    InvalidReport,
    /// A stage received an item of a type it cannot handle
    UnexpectedItem,

    // Integration
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ConfigValidation => "ERR_CONFIG_VALIDATION",
            ExErrorKind::ChainTypeMismatch => "ERR_CHAIN_TYPE_MISMATCH",
            ExErrorKind::PluginLoad => "ERR_PLUGIN_LOAD",
            ExErrorKind::MissingProperty => "ERR_MISSING_PROPERTY",
            ExErrorKind::DiffComparison => "ERR_DIFF_COMPARISON",
            ExErrorKind::InvalidReport => "ERR_INVALID_REPORT",
            ExErrorKind::UnexpectedItem => "ERR_UNEXPECTED_ITEM",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus whatever context
/// the failing layer knew about (rule, transformer, report path, run).
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    rule_id: Option<String>,
    transformer_id: Option<String>,
    path: Option<String>,
    filename: Option<String>,
    run_id: Option<RunId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            rule_id: None,
            transformer_id: None,
            path: None,
            filename: None,
            run_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add rule ID context
    pub fn with_rule_id(mut self, id: impl Into<String>) -> Self {
        self.rule_id = Some(id.into());
        self
    }

    /// Add transformer ID context
    pub fn with_transformer_id(mut self, id: impl Into<String>) -> Self {
        self.transformer_id = Some(id.into());
        self
    }

    /// Add property path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add report filename context
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the rule ID context, if any
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    /// Get the transformer ID context, if any
    pub fn transformer_id(&self) -> Option<&str> {
        self.transformer_id.as_deref()
    }

    /// Get the property path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the report filename context, if any
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(rule_id) = &self.rule_id {
            write!(f, " (rule: {})", rule_id)?;
        }
        if let Some(transformer_id) = &self.transformer_id {
            write!(f, " (transformer: {})", transformer_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(filename) = &self.filename {
            write!(f, " (file: {})", filename)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Concrete failures raised across report-toolkit
///
/// Each variant converts into an [`ExError`] with the matching kind; code
/// that only needs classification should work with `ExError` directly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RtkError {
    // ===== Configuration Errors =====
    /// Rule id is not registered
    #[error("Unknown rule: {rule_id}")]
    UnknownRule { rule_id: String },

    /// Transformer id is not registered
    #[error("Unknown transformer: {transformer_id}")]
    UnknownTransformer { transformer_id: String },

    /// Preset name is not contributed by any registered plugin
    #[error("Unknown config preset: {name}")]
    UnknownPreset { name: String },

    /// Rule rejected its options
    #[error("Invalid options for rule {rule_id}: {reason}")]
    InvalidRuleOptions { rule_id: String, reason: String },

    /// Transformer rejected its options
    #[error("Invalid options for transformer {transformer_id}: {reason}")]
    InvalidTransformerOptions {
        transformer_id: String,
        reason: String,
    },

    /// Config value has the wrong shape
    #[error("Invalid config value at {key}: {reason}")]
    InvalidConfigValue { key: String, reason: String },

    /// Transformer chain has no transformers
    #[error("Transformer chain is empty")]
    EmptyChain,

    // ===== Chain Errors =====
    /// Adjacent transformers have incompatible item types
    #[error("Transformer {upstream} outputs {output_type} but {downstream} expects {input_type}")]
    ChainTypeMismatch {
        upstream: String,
        output_type: String,
        downstream: String,
        input_type: String,
    },

    /// No default transformer registered for the requested end type
    #[error("No default transformer registered for end type {end_type}")]
    NoDefaultTransformer { end_type: String },

    /// The default transformer cannot accept the chain's output
    #[error("Default transformer {transformer_id} expects {input_type} but chain outputs {output_type}")]
    DefaultTransformerMismatch {
        transformer_id: String,
        input_type: String,
        output_type: String,
    },

    // ===== Plugin Errors =====
    /// Plugin id could not be resolved
    #[error("Plugin not found: {plugin_id}")]
    PluginNotFound { plugin_id: String },

    // ===== Per-item Errors =====
    /// Rule precondition unmet
    #[error("Property \"{path}\" missing in report at {filename}")]
    MissingProperty { path: String, filename: String },

    /// Raw input is not a report object
    #[error("Invalid report: {reason}")]
    InvalidReport { reason: String },

    /// Diff walk exceeded the nesting limit
    #[error("Diff exceeded maximum depth {max_depth} at {path}")]
    DiffDepthExceeded { path: String, max_depth: usize },

    /// Stage received an item it cannot handle
    #[error("Transformer {transformer_id} expected {expected} item, got {actual}")]
    UnexpectedItem {
        transformer_id: String,
        expected: String,
        actual: String,
    },

    // ===== Generic Errors =====
    /// I/O error (reading reports or config files)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from RtkError to ExError
impl From<RtkError> for ExError {
    fn from(err: RtkError) -> Self {
        let message = err.to_string();
        match err {
            RtkError::UnknownRule { rule_id } | RtkError::InvalidRuleOptions { rule_id, .. } => {
                ExError::new(ExErrorKind::ConfigValidation)
                    .with_rule_id(rule_id)
                    .with_message(message)
            }
            RtkError::UnknownTransformer { transformer_id }
            | RtkError::InvalidTransformerOptions { transformer_id, .. } => {
                ExError::new(ExErrorKind::ConfigValidation)
                    .with_transformer_id(transformer_id)
                    .with_message(message)
            }
            RtkError::InvalidConfigValue { key, .. } => {
                ExError::new(ExErrorKind::ConfigValidation)
                    .with_path(key)
                    .with_message(message)
            }
            RtkError::UnknownPreset { .. }
            | RtkError::EmptyChain
            | RtkError::NoDefaultTransformer { .. } => {
                ExError::new(ExErrorKind::ConfigValidation).with_message(message)
            }
            RtkError::DefaultTransformerMismatch { transformer_id, .. } => {
                ExError::new(ExErrorKind::ConfigValidation)
                    .with_transformer_id(transformer_id)
                    .with_message(message)
            }
            RtkError::ChainTypeMismatch { downstream, .. } => {
                ExError::new(ExErrorKind::ChainTypeMismatch)
                    .with_transformer_id(downstream)
                    .with_message(message)
            }
            RtkError::PluginNotFound { .. } => {
                ExError::new(ExErrorKind::PluginLoad).with_message(message)
            }
            RtkError::MissingProperty { path, filename } => {
                ExError::new(ExErrorKind::MissingProperty)
                    .with_path(path)
                    .with_filename(filename)
                    .with_message(message)
            }
            RtkError::InvalidReport { .. } => {
                ExError::new(ExErrorKind::InvalidReport).with_message(message)
            }
            RtkError::DiffDepthExceeded { path, .. } => ExError::new(ExErrorKind::DiffComparison)
                .with_path(path)
                .with_message(message),
            RtkError::UnexpectedItem { transformer_id, .. } => {
                ExError::new(ExErrorKind::UnexpectedItem)
                    .with_transformer_id(transformer_id)
                    .with_message(message)
            }
            RtkError::Io { .. } => ExError::new(ExErrorKind::Io).with_message(message),
            RtkError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            RtkError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        RtkError::Serialization {
            message: err.to_string(),
        }
        .into()
    }
}

impl From<std::io::Error> for ExError {
    fn from(err: std::io::Error) -> Self {
        RtkError::Io {
            message: err.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::MissingProperty)
            .with_op("inspect")
            .with_rule_id("cpu-usage")
            .with_message("header.cpus missing");
        let s = err.to_string();
        assert!(s.starts_with("[ERR_MISSING_PROPERTY]"));
        assert!(s.contains("'inspect'"));
        assert!(s.contains("rule: cpu-usage"));
    }

    #[test]
    fn test_chain_mismatch_names_downstream() {
        let ex: ExError = RtkError::ChainTypeMismatch {
            upstream: "filter".into(),
            output_type: "object".into(),
            downstream: "redact".into(),
            input_type: "report".into(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::ChainTypeMismatch);
        assert_eq!(ex.transformer_id(), Some("redact"));
        assert!(ex.message().contains("filter"));
    }
}
