//! Diff command
//!
//! Usage: rtk diff <REPORT1> <REPORT2> [--filter <PATH>...] [--format text|json]

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use rtk_core::api;
use rtk_core::diff::render_human_summary;
use rtk_core::DiffOptions;

use super::{CliResult, Context, Format};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Older report
    pub report1: PathBuf,

    /// Newer report
    pub report2: PathBuf,

    /// Paths or property names to leave out (repeatable or comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub filter: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Execute diff command
pub fn execute(ctx: &Context, args: DiffArgs) -> CliResult {
    let options = ctx.report_options();
    let report1 = api::load_report(&args.report1, &options)?;
    let report2 = api::load_report(&args.report2, &options)?;

    let diff_options = DiffOptions {
        show_secrets_unsafe: ctx.show_secrets_unsafe,
        ..DiffOptions::default()
    }
    .filter(args.filter);
    let results = api::diff(&report1, &report2, &diff_options)?;

    let mut out = super::stdout();
    match args.format {
        Format::Text => out.write_all(render_human_summary(&results).as_bytes())?,
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?,
    }
    out.flush()?;
    Ok(())
}
