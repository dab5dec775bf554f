//! Plugins: bundles of rules, transformers and presets.
//!
//! How a plugin id becomes a [`Plugin`] is the business of a
//! [`PluginResolver`]; the registry only records what each plugin
//! contributed so it can be deregistered as a unit.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ConfigObject, RuleSetting};
use crate::errors::{Result, RtkError};
use crate::registry::Registry;
use crate::rules::{self, RuleDefinition};
use crate::transform::{ItemType, Transformer};
use crate::transformers;

/// Id of the plugin shipping the built-in rules and transformers
pub const BUILTIN_PLUGIN_ID: &str = "report-toolkit";

/// Name of the built-in preset, without the plugin prefix
pub const RECOMMENDED_PRESET: &str = "recommended";

pub struct Plugin {
    pub id: String,
    pub rules: Vec<Arc<dyn RuleDefinition>>,
    pub transformers: Vec<Arc<dyn Transformer>>,
    /// Preset names are namespaced `<plugin>:<name>` on registration
    pub presets: Vec<(String, ConfigObject)>,
    pub defaults: Vec<(ItemType, String)>,
}

impl Plugin {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
            transformers: Vec::new(),
            presets: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Arc<dyn RuleDefinition>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn with_preset(mut self, name: impl Into<String>, preset: ConfigObject) -> Self {
        self.presets.push((name.into(), preset));
        self
    }

    pub fn with_default(mut self, end_type: ItemType, transformer_id: impl Into<String>) -> Self {
        self.defaults.push((end_type, transformer_id.into()));
        self
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field(
                "transformers",
                &self.transformers.iter().map(|t| t.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Turns a plugin id into a plugin
pub trait PluginResolver {
    /// # Errors
    ///
    /// Returns `PluginLoad` if the id cannot be resolved.
    fn resolve(&self, plugin_id: &str) -> Result<Plugin>;
}

type PluginFactory = Box<dyn Fn() -> Plugin + Send + Sync>;

/// Resolver backed by factories registered in code
#[derive(Default)]
pub struct StaticPluginResolver {
    factories: BTreeMap<String, PluginFactory>,
}

impl StaticPluginResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that knows the built-in plugin
    pub fn with_builtin() -> Self {
        Self::new().with(BUILTIN_PLUGIN_ID, builtin_plugin)
    }

    pub fn with<F>(mut self, plugin_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Plugin + Send + Sync + 'static,
    {
        self.factories.insert(plugin_id.into(), Box::new(factory));
        self
    }
}

impl PluginResolver for StaticPluginResolver {
    fn resolve(&self, plugin_id: &str) -> Result<Plugin> {
        let factory = self
            .factories
            .get(plugin_id)
            .ok_or_else(|| RtkError::PluginNotFound {
                plugin_id: plugin_id.to_string(),
            })?;
        Ok(factory())
    }
}

/// The `report-toolkit` plugin
pub fn builtin_plugin() -> Plugin {
    let recommended = ConfigObject::default()
        .with_rule(rules::cpu_usage::ID, RuleSetting::Enabled(true))
        .with_rule(rules::library_mismatch::ID, RuleSetting::Enabled(true));
    let mut plugin = Plugin::new(BUILTIN_PLUGIN_ID)
        .with_rule(Arc::new(rules::CpuUsage::new()))
        .with_rule(Arc::new(rules::LibraryMismatch::new()))
        .with_preset(RECOMMENDED_PRESET, recommended)
        .with_default(ItemType::String, transformers::json::ID);
    for transformer in transformers::builtin() {
        plugin = plugin.with_transformer(transformer);
    }
    plugin
}

/// A registry with only the built-in plugin registered
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_plugin(builtin_plugin());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_builtin_contents() {
        let registry = builtin_registry();
        assert_eq!(registry.rule_ids(), vec!["cpu-usage", "library-mismatch"]);
        assert!(registry.transformer_ids().contains(&"csv"));
        assert_eq!(registry.preset_names(), vec!["report-toolkit:recommended"]);
        let default = registry.default_transformer(ItemType::String).unwrap();
        assert_eq!(default.id(), "json");
    }

    #[test]
    fn test_unknown_plugin_is_plugin_load_error() {
        let err = StaticPluginResolver::with_builtin()
            .resolve("left-pad")
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::PluginLoad);
    }

    #[test]
    fn test_deregister_plugin_removes_contributions() {
        let mut registry = builtin_registry();
        let removed = registry.deregister_plugins(&[BUILTIN_PLUGIN_ID]);
        assert_eq!(removed.len(), 1);
        assert!(registry.rule_ids().is_empty());
        assert!(registry.transformer_ids().is_empty());
        assert!(registry.preset_names().is_empty());
        assert!(registry.default_transformer(ItemType::String).is_none());
        assert!(!registry.is_plugin_registered(BUILTIN_PLUGIN_ID));
    }
}
