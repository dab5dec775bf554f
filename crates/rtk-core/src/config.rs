//! Config Resolver.
//!
//! Raw config is a preset name, an inline object, or a list of either.
//! Sources merge in order: for each rule or transformer id, later sources
//! override earlier ones option by option (shallow, per top-level key).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ExError, Result, RtkError};
use crate::registry::Registry;
use crate::rules::Options;

/// Config as written by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConfig {
    Preset(String),
    List(Vec<RawConfig>),
    Object(ConfigObject),
}

impl From<ConfigObject> for RawConfig {
    fn from(object: ConfigObject) -> Self {
        RawConfig::Object(object)
    }
}

impl From<&str> for RawConfig {
    fn from(name: &str) -> Self {
        RawConfig::Preset(name.to_string())
    }
}

impl RawConfig {
    /// Read a config file; `.yaml`/`.yml` files are YAML, anything else JSON
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Serialization` if it
    /// does not parse.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::from(e).with_filename(path.display().to_string())
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    /// # Errors
    ///
    /// Returns `Serialization` if the text is not valid YAML config.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            RtkError::Serialization {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// One inline config source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigObject {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, RuleSetting>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transformers: BTreeMap<String, Options>,
}

impl ConfigObject {
    pub fn with_rule(mut self, id: impl Into<String>, setting: RuleSetting) -> Self {
        self.rules.insert(id.into(), setting);
        self
    }

    pub fn with_transformer(mut self, id: impl Into<String>, options: Options) -> Self {
        self.transformers.insert(id.into(), options);
        self
    }
}

/// `true`, `false` or an options object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSetting {
    Enabled(bool),
    Options(Options),
}

/// Normalized settings of one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub enabled: bool,
    #[serde(default)]
    pub options: Options,
}

/// Normalized config consumed by the engines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
    #[serde(default)]
    pub transformers: BTreeMap<String, Options>,
}

impl Config {
    /// Options for a transformer, empty when unconfigured
    pub fn transformer_options(&self, id: &str) -> Options {
        self.transformers.get(id).cloned().unwrap_or_default()
    }

    /// Whether the config names any rules; if not, every registered rule runs
    pub fn filters_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    fn apply(&mut self, source: &ConfigObject, registry: &Registry) -> Result<()> {
        for (id, setting) in &source.rules {
            if registry.rule(id).is_none() {
                return Err(RtkError::UnknownRule {
                    rule_id: id.clone(),
                }
                .into());
            }
            let entry = self.rules.entry(id.clone()).or_default();
            match setting {
                RuleSetting::Enabled(enabled) => entry.enabled = *enabled,
                RuleSetting::Options(options) => {
                    entry.enabled = true;
                    merge_options(&mut entry.options, options);
                }
            }
        }
        for (id, options) in &source.transformers {
            if registry.transformer(id).is_none() {
                return Err(RtkError::UnknownTransformer {
                    transformer_id: id.clone(),
                }
                .into());
            }
            merge_options(self.transformers.entry(id.clone()).or_default(), options);
        }
        Ok(())
    }

    fn validate(&self, registry: &Registry) -> Result<()> {
        for (id, rule) in self.rules.iter().filter(|(_, r)| r.enabled) {
            if let Some(definition) = registry.rule(id) {
                definition.inspect(&rule.options)?;
            }
        }
        for (id, options) in &self.transformers {
            if let Some(transformer) = registry.transformer(id) {
                transformer.transform(options)?;
            }
        }
        Ok(())
    }
}

/// Shallow merge: each top-level key of `overrides` replaces the same key
pub fn merge_options(base: &mut Options, overrides: &Options) {
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
}

/// Merge raw config sources into a normalized [`Config`]
///
/// Options of every enabled rule and configured transformer are checked by
/// instantiating it once, so bad options fail here rather than mid-run.
///
/// # Errors
///
/// Returns `ConfigValidation` for unknown presets, rule or transformer ids,
/// and for options their implementation rejects.
pub fn resolve(raw: &RawConfig, registry: &Registry) -> Result<Config> {
    let mut config = Config::default();
    apply_raw(&mut config, raw, registry)?;
    config.validate(registry)?;
    Ok(config)
}

/// Presets are flat objects, so a preset source never recurses
fn apply_raw(config: &mut Config, raw: &RawConfig, registry: &Registry) -> Result<()> {
    match raw {
        RawConfig::Preset(name) => {
            let preset = registry.preset(name).ok_or_else(|| RtkError::UnknownPreset {
                name: name.clone(),
            })?;
            config.apply(preset, registry)
        }
        RawConfig::List(sources) => sources
            .iter()
            .try_for_each(|source| apply_raw(config, source, registry)),
        RawConfig::Object(object) => config.apply(object, registry),
    }
}

/// Parse config from a JSON value (e.g. an already-loaded rc file)
///
/// # Errors
///
/// Returns `ConfigValidation` if the value has no valid config shape.
pub fn raw_from_value(value: Value) -> Result<RawConfig> {
    serde_json::from_value(value).map_err(|e| {
        RtkError::InvalidConfigValue {
            key: "config".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
