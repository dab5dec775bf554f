//! Inspection Engine: run rules over reports and stream their messages.

pub mod engine;
pub mod options;

pub use engine::{enabled_rules, sort_messages, Inspector};
pub use options::{ErrorPolicy, InspectOptions, InspectScope, SortDirection, DEFAULT_SORT_FIELD};
