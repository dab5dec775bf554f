//! Structural report diff.
//!
//! ## Entry point
//!
//! ```ignore
//! use rtk_core::diff::{diff_reports, DiffOptions};
//!
//! let results = diff_reports(&report1, &report2, &DiffOptions::default())?;
//! let text = rtk_core::diff::render_human_summary(&results.collect::<Result<Vec<_>, _>>()?);
//! ```
//!
//! ## Guarantees
//!
//! - **Order**: results follow the walk: report2's keys first, then keys only
//!   report1 has, depth first. No sorting is applied.
//! - **Self-diff**: diffing a report against itself yields nothing.
//! - **Mirror**: swapping the arguments swaps `add`/`remove` and the old and
//!   new values of `replace`, with the same paths.
//! - **Filtering**: filtered paths are never visited.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{diff_reports, diff_values, DiffWalker};
pub use human_summary::render_human_summary;
pub use model::{DiffOp, DiffOptions, DiffResult};
