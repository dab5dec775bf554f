//! report-toolkit CLI
//!
//! Command-line interface for diffing, inspecting and transforming
//! diagnostic reports

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rtk_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "rtk")]
#[command(about = "report-toolkit - Analyze diagnostic reports", long_about = None)]
struct Cli {
    /// Config file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not redact secrets from reports
    #[arg(long, global = true)]
    show_secrets_unsafe: bool,

    /// Human-readable debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON logs on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show differences between two reports
    Diff(commands::diff::DiffArgs),
    /// Run rules against one or more reports
    Inspect(commands::inspect::InspectArgs),
    /// Pipe reports through a chain of transformers
    Transform(commands::transform::TransformArgs),
    /// List registered rules
    ListRules(commands::list::ListArgs),
    /// List registered transformers
    ListTransformers(commands::list::ListArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(Profile::from_flags(cli.verbose, cli.log_json));

    let result = commands::Context::load(cli.config.as_deref(), cli.show_secrets_unsafe)
        .and_then(|ctx| match cli.command {
            Commands::Diff(args) => commands::diff::execute(&ctx, args),
            Commands::Inspect(args) => commands::inspect::execute(&ctx, args),
            Commands::Transform(args) => commands::transform::execute(&ctx, args),
            Commands::ListRules(args) => commands::list::execute_rules(&ctx, args),
            Commands::ListTransformers(args) => commands::list::execute_transformers(&ctx, args),
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
