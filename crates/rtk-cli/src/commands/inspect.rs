//! Inspect command
//!
//! Usage: rtk inspect <REPORT>... [--severity <LEVEL>] [--sort] [--strict] [--aggregate]

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use rtk_core::inspect::DEFAULT_SORT_FIELD;
use rtk_core::{
    api, ErrorPolicy, InspectOptions, InspectScope, Message, Severity, SortDirection,
};

use super::{CliResult, Context, Format};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for SortDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Asc => SortDirection::Asc,
            Direction::Desc => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Report files, inspected in the given order
    #[arg(required = true)]
    pub reports: Vec<PathBuf>,

    /// Minimum severity to show (info, warning, error)
    #[arg(short, long, default_value = "info", value_parser = parse_severity)]
    pub severity: Severity,

    /// Sort messages instead of streaming them in report order
    #[arg(long)]
    pub sort: bool,

    /// Dotted path used as the sort key
    #[arg(long, default_value = DEFAULT_SORT_FIELD)]
    pub sort_field: String,

    #[arg(long, value_enum, default_value_t = Direction::Asc)]
    pub sort_direction: Direction,

    /// Fail on the first rule error instead of reporting it as a message
    #[arg(long)]
    pub strict: bool,

    /// Run each rule once across all reports
    #[arg(long)]
    pub aggregate: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse().map_err(|e: rtk_core::ExError| e.to_string())
}

impl InspectArgs {
    fn options(&self, show_secrets_unsafe: bool) -> InspectOptions {
        let mut options = InspectOptions::default().with_severity(self.severity);
        if self.sort {
            options = options.sorted_by(self.sort_field.clone(), self.sort_direction.into());
        }
        if self.strict {
            options = options.with_error_policy(ErrorPolicy::Strict);
        }
        if self.aggregate {
            options = options.with_scope(InspectScope::Aggregate);
        }
        options.show_secrets_unsafe = show_secrets_unsafe;
        options
    }
}

/// Execute inspect command
pub fn execute(ctx: &Context, args: InspectArgs) -> CliResult {
    let options = args.options(ctx.show_secrets_unsafe);
    let messages = api::inspect(
        ctx.reports(args.reports),
        &ctx.registry,
        &ctx.config,
        &options,
    )?;

    let mut out = super::stdout();
    match args.format {
        Format::Text => {
            for message in &messages {
                writeln!(out, "{}", format_message(message))?;
            }
        }
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&messages)?)?,
    }
    out.flush()?;
    Ok(())
}

fn format_message(message: &Message) -> String {
    match &message.filename {
        Some(file) => format!(
            "{}: [{}] {} ({})",
            message.severity, message.rule_id, message.message, file
        ),
        None => format!(
            "{}: [{}] {}",
            message.severity, message.rule_id, message.message
        ),
    }
}
