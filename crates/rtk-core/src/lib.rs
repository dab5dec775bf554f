//! report-toolkit core
//!
//! Stream-processing engine for diagnostic reports:
//! - Diff Engine: lazy structural comparison of two reports
//! - Inspection Engine: stateful rules run over reports, producing messages
//! - Transformer Chain: type-checked, pull-based composition of converters
//! - Registry and Config Resolver feeding all three
//!
//! Sequences are plain iterators of `Result` items; see [`stream`].

pub mod api;
pub mod config;
pub mod diff;
pub mod errors;
pub mod inspect;
pub mod logging_facility;
pub mod message;
pub mod path;
pub mod plugin;
pub mod registry;
pub mod report;
pub mod rules;
pub mod stream;
pub mod transform;
pub mod transformers;

pub use rtk_core_types;

// Re-export commonly used types
pub use api::{diff, inspect, load_config, transform, use_plugin};
pub use config::{Config, RawConfig};
pub use diff::{DiffOp, DiffOptions, DiffResult};
pub use errors::{ExError, ExErrorKind, Result, RtkError};
pub use inspect::{ErrorPolicy, InspectOptions, InspectScope, Inspector, SortDirection};
pub use message::{Finding, Message, Severity};
pub use plugin::{builtin_plugin, builtin_registry, Plugin, PluginResolver, StaticPluginResolver};
pub use registry::Registry;
pub use report::{Report, ReportOptions};
pub use transform::{Item, ItemType, TransformOptions, TransformerChain};
