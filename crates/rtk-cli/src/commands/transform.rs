//! Transform command
//!
//! Usage: rtk transform <REPORT>... [-t <ID>...] [-o <ID>.<KEY>=<VALUE>...]
//!
//! Items are written as they are pulled from the chain, one per line.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use rtk_core::rules::Options;
use rtk_core::{log_op_end, log_op_error, log_op_start};
use rtk_core::{Item, TransformOptions, TransformerChain};
use serde_json::Value;

use super::{CliResult, Context};

#[derive(Debug, Args)]
pub struct TransformArgs {
    /// Report files, fed to the chain in the given order
    #[arg(required = true)]
    pub reports: Vec<PathBuf>,

    /// Transformer ids, in chain order (repeatable or comma-separated)
    #[arg(short, long = "transformer", value_delimiter = ',', default_value = "json")]
    pub transformers: Vec<String>,

    /// Per-transformer option override, e.g. `csv.header=false`
    #[arg(short = 'o', long = "option", value_parser = parse_override)]
    pub overrides: Vec<(String, String, Value)>,
}

/// Split `<id>.<key>=<value>`; the value is read as JSON, else as a string
fn parse_override(s: &str) -> Result<(String, String, Value), String> {
    let (target, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <transformer>.<key>=<value>, got {:?}", s))?;
    let (id, key) = target
        .split_once('.')
        .filter(|(id, key)| !id.is_empty() && !key.is_empty())
        .ok_or_else(|| format!("expected <transformer>.<key>, got {:?}", target))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((id.to_string(), key.to_string(), value))
}

fn transform_options(overrides: Vec<(String, String, Value)>) -> TransformOptions {
    let mut options = TransformOptions::default();
    for (id, key, value) in overrides {
        options
            .overrides
            .entry(id)
            .or_insert_with(Options::new)
            .insert(key, value);
    }
    options
}

/// Execute transform command
pub fn execute(ctx: &Context, args: TransformArgs) -> CliResult {
    let start = Instant::now();
    log_op_start!("cli_transform");

    let options = transform_options(args.overrides);
    let chain = TransformerChain::resolve(
        args.transformers.as_slice(),
        &ctx.registry,
        &ctx.config,
        &options,
    )?;
    tracing::debug!(chain = ?chain.ids(), appended_default = chain.appended_default(), "chain resolved");

    let source = ctx.reports(args.reports).map(|r| r.map(Item::Report));
    let mut out = super::stdout();
    let mut written = 0u64;
    for item in chain.execute(source)? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                log_op_error!(
                    "cli_transform",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                out.flush()?;
                return Err(e.into());
            }
        };
        match item {
            Item::String(text) if text.ends_with('\n') => out.write_all(text.as_bytes())?,
            Item::String(text) => writeln!(out, "{}", text)?,
            other => writeln!(out, "{}", other.to_value())?,
        }
        written += 1;
    }
    out.flush()?;

    log_op_end!(
        "cli_transform",
        duration_ms = start.elapsed().as_millis() as u64,
        result_count = written
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_override_json_and_string_values() {
        assert_eq!(
            parse_override("csv.header=false").unwrap(),
            ("csv".to_string(), "header".to_string(), json!(false))
        );
        assert_eq!(
            parse_override("newline.eol=;").unwrap(),
            ("newline".to_string(), "eol".to_string(), json!(";"))
        );
        assert!(parse_override("csv=false").is_err());
        assert!(parse_override(".header=false").is_err());
    }

    #[test]
    fn test_overrides_grouped_by_transformer() {
        let options = transform_options(vec![
            ("csv".into(), "header".into(), json!(false)),
            ("csv".into(), "flatten".into(), json!(true)),
        ]);
        assert_eq!(
            Value::Object(options.overrides["csv"].clone()),
            json!({"header": false, "flatten": true})
        );
    }
}
