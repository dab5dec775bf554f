//! Subcommands and the state they share

use std::io::{BufWriter, Stdout};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use rtk_core::config::ConfigObject;
use rtk_core::plugin::BUILTIN_PLUGIN_ID;
use rtk_core::{api, Config, RawConfig, Registry, ReportOptions, StaticPluginResolver};

pub mod diff;
pub mod inspect;
pub mod list;
pub mod transform;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Output format shared by the reporting subcommands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Registry and resolved config for one invocation
pub struct Context {
    pub registry: Registry,
    pub config: Config,
    pub show_secrets_unsafe: bool,
}

impl Context {
    /// Register the built-in plugin, then resolve `config_path` against it
    pub fn load(
        config_path: Option<&Path>,
        show_secrets_unsafe: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut registry = Registry::new();
        api::use_plugin(
            &mut registry,
            &StaticPluginResolver::with_builtin(),
            BUILTIN_PLUGIN_ID,
        )?;

        let raw = match config_path {
            Some(path) => RawConfig::from_path(path)?,
            None => RawConfig::from(ConfigObject::default()),
        };
        let config = api::load_config(&raw, &registry)?;

        Ok(Self {
            registry,
            config,
            show_secrets_unsafe,
        })
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions::default().unsafe_show_secrets(self.show_secrets_unsafe)
    }

    /// Reports read lazily, one file per pull
    pub fn reports(
        &self,
        files: Vec<PathBuf>,
    ) -> impl Iterator<Item = rtk_core::Result<rtk_core::Report>> {
        api::reports_from_paths(files, self.report_options())
    }
}

pub fn stdout() -> BufWriter<Stdout> {
    BufWriter::new(std::io::stdout())
}
