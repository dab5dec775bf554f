//! list-rules and list-transformers commands

use std::io::Write;

use clap::Args;
use serde_json::json;

use super::{CliResult, Context, Format};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Execute list-rules command
pub fn execute_rules(ctx: &Context, args: ListArgs) -> CliResult {
    let mut out = super::stdout();
    match args.format {
        Format::Text => {
            for rule in ctx.registry.rules() {
                let docs = &rule.meta().docs;
                writeln!(out, "{:<20} {}", rule.id(), docs.description)?;
            }
        }
        Format::Json => {
            let rules: Vec<_> = ctx
                .registry
                .rules()
                .map(|rule| {
                    let enabled = !ctx.config.filters_rules()
                        || ctx.config.rules.get(rule.id()).is_some_and(|r| r.enabled);
                    json!({
                        "id": rule.id(),
                        "enabled": enabled,
                        "docs": rule.meta().docs,
                    })
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&rules)?)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Execute list-transformers command
pub fn execute_transformers(ctx: &Context, args: ListArgs) -> CliResult {
    let mut out = super::stdout();
    match args.format {
        Format::Text => {
            for t in ctx.registry.transformers() {
                writeln!(
                    out,
                    "{:<12} {:>6} -> {:<6} {}",
                    t.id(),
                    t.input_type().as_str(),
                    t.output_type().as_str(),
                    t.description()
                )?;
            }
        }
        Format::Json => {
            let transformers: Vec<_> = ctx
                .registry
                .transformers()
                .map(|t| {
                    json!({
                        "id": t.id(),
                        "description": t.description(),
                        "input": t.input_type(),
                        "output": t.output_type(),
                    })
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&transformers)?)?;
        }
    }
    out.flush()?;
    Ok(())
}
