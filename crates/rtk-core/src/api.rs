//! Materializing entry points.
//!
//! Each function runs one engine to completion under a fresh [`RunId`],
//! logging start/end/error with the canonical fields. Failed calls return
//! the structured error stamped with the operation and run id; partial
//! results are only returned by the `*_best_effort` variants.
//!
//! The lazy engines ([`DiffWalker`](crate::diff::DiffWalker),
//! [`Inspector`], [`ChainRun`](crate::transform::ChainRun)) are available
//! for callers that want to pull results one at a time.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rtk_core_types::RunId;

use crate::config::{self, Config, RawConfig};
use crate::diff::{self, DiffOptions, DiffResult};
use crate::errors::{ExError, Result};
use crate::inspect::{InspectOptions, Inspector};
use crate::message::Message;
use crate::plugin::PluginResolver;
use crate::registry::{RegisteredPlugin, Registry};
use crate::report::{Report, ReportOptions};
use crate::stream::{collect_all, collect_best_effort, BestEffort};
use crate::transform::{Item, TransformOptions, TransformerChain};
use crate::{log_op_end, log_op_error, log_op_start};

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn stamp(err: ExError, op: &str, run_id: &RunId) -> ExError {
    let err = if err.op().is_none() { err.with_op(op) } else { err };
    err.with_run_id(run_id.clone())
}

/// Run `body` as operation `op`, logging its outcome
fn instrumented<T>(
    op: &'static str,
    body: impl FnOnce() -> Result<T>,
    count: impl FnOnce(&T) -> usize,
) -> Result<T> {
    let run_id = RunId::new();
    log_op_start!(op, run_id = %run_id);
    let start = Instant::now();
    match body() {
        Ok(value) => {
            log_op_end!(
                op,
                duration_ms = elapsed_ms(start),
                run_id = %run_id,
                result_count = count(&value) as u64
            );
            Ok(value)
        }
        Err(e) => {
            let e = stamp(e, op, &run_id);
            log_op_error!(op, e.clone(), duration_ms = elapsed_ms(start), run_id = %run_id);
            Err(e)
        }
    }
}

/// Read and build one report from a JSON file
///
/// # Errors
///
/// Returns `Io`, `Serialization` or `InvalidReport`, naming the file.
pub fn load_report(path: &Path, options: &ReportOptions) -> Result<Report> {
    let filename = path.display().to_string();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ExError::from(e).with_filename(filename.clone()))?;
    let options = ReportOptions {
        filename: Some(options.filename.clone().unwrap_or_else(|| filename.clone())),
        ..options.clone()
    };
    Report::from_json_str(&text, &options).map_err(|e| e.with_filename(filename))
}

/// Lazily load reports; each file is read when its report is pulled
pub fn reports_from_paths(
    paths: Vec<PathBuf>,
    options: ReportOptions,
) -> impl Iterator<Item = Result<Report>> {
    paths.into_iter().map(move |path| load_report(&path, &options))
}

/// Every difference between two reports
///
/// Unless `show_secrets_unsafe` is set, unredacted inputs are redacted
/// before comparison.
///
/// # Errors
///
/// Returns `DiffComparison` for trees too deep to walk, `InvalidReport` for
/// non-object roots.
pub fn diff(report1: &Report, report2: &Report, options: &DiffOptions) -> Result<Vec<DiffResult>> {
    instrumented(
        "diff",
        || {
            let (report1, report2) = if options.show_secrets_unsafe {
                (report1.clone(), report2.clone())
            } else {
                (report1.to_redacted(), report2.to_redacted())
            };
            collect_all(diff::diff_reports(&report1, &report2, options)?)
        },
        Vec::len,
    )
}

/// Every message from inspecting `reports`, filtered and optionally sorted
///
/// # Errors
///
/// Returns `ConfigValidation` before any report is read for bad rule ids
/// or options; with `ErrorPolicy::Strict`, the first rule failure.
pub fn inspect<I>(
    reports: I,
    registry: &Registry,
    config: &Config,
    options: &InspectOptions,
) -> Result<Vec<Message>>
where
    I: IntoIterator<Item = Result<Report>>,
{
    instrumented(
        "inspect",
        || {
            let inspector = Inspector::new(reports.into_iter(), registry, config, options)?;
            if options.sort {
                inspector.collect_sorted(&options.sort_field, options.sort_direction)
            } else {
                collect_all(inspector)
            }
        },
        Vec::len,
    )
}

/// Like [`inspect`] but keeps going past errors, returning them alongside
/// the messages; results are not sorted
///
/// # Errors
///
/// Setup errors (unknown rules, bad options) still fail the call.
pub fn inspect_best_effort<I>(
    reports: I,
    registry: &Registry,
    config: &Config,
    options: &InspectOptions,
) -> Result<BestEffort<Message>>
where
    I: IntoIterator<Item = Result<Report>>,
{
    instrumented(
        "inspect_best_effort",
        || {
            let inspector = Inspector::new(reports.into_iter(), registry, config, options)?;
            Ok(collect_best_effort(inspector))
        },
        |partial| partial.items.len(),
    )
}

/// Run `source` through the chain named by `transformer_ids`
///
/// # Errors
///
/// Structural errors (`ConfigValidation`, `ChainTypeMismatch`) fail before
/// the source is pulled; a per-item error ends the run.
pub fn transform<S, I>(
    transformer_ids: &[S],
    source: I,
    registry: &Registry,
    config: &Config,
    options: &TransformOptions,
) -> Result<Vec<Item>>
where
    S: AsRef<str>,
    I: IntoIterator<Item = Result<Item>>,
{
    instrumented(
        "transform",
        || {
            let chain = TransformerChain::resolve(transformer_ids, registry, config, options)?;
            tracing::debug!(chain = ?chain.ids(), "transformer chain resolved");
            collect_all(chain.execute(source.into_iter())?)
        },
        Vec::len,
    )
}

/// Like [`transform`], but returns the items produced before a failure
/// together with that failure
///
/// # Errors
///
/// Structural errors still fail the call.
pub fn transform_best_effort<S, I>(
    transformer_ids: &[S],
    source: I,
    registry: &Registry,
    config: &Config,
    options: &TransformOptions,
) -> Result<BestEffort<Item>>
where
    S: AsRef<str>,
    I: IntoIterator<Item = Result<Item>>,
{
    instrumented(
        "transform_best_effort",
        || {
            let chain = TransformerChain::resolve(transformer_ids, registry, config, options)?;
            Ok(collect_best_effort(chain.execute(source.into_iter())?))
        },
        |partial| partial.items.len(),
    )
}

/// Merge raw config sources against the registry's rules, transformers and
/// presets
///
/// # Errors
///
/// Returns `ConfigValidation` for unknown ids or presets and rejected options.
pub fn load_config(raw: &RawConfig, registry: &Registry) -> Result<Config> {
    instrumented(
        "load_config",
        || config::resolve(raw, registry),
        |config| config.rules.len() + config.transformers.len(),
    )
}

/// Resolve a plugin and register everything it contributes
///
/// Using the same plugin twice leaves the registry as a single use would.
///
/// # Errors
///
/// Returns `PluginLoad` if the resolver does not know `plugin_id`.
pub fn use_plugin(
    registry: &mut Registry,
    resolver: &dyn PluginResolver,
    plugin_id: &str,
) -> Result<RegisteredPlugin> {
    instrumented(
        "use_plugin",
        || {
            let plugin = resolver.resolve(plugin_id)?;
            Ok(registry.register_plugin(plugin))
        },
        |record| record.rules.len() + record.transformers.len(),
    )
}
