//! Registry of rules, transformers and presets.
//!
//! The registry is an explicit value created at startup, filled by plugin
//! registration and then lent to the engines. Mutation happens only through
//! `register_*`, `deregister*` and plugin (de)registration; it is expected
//! to finish before any pipeline runs. Listing order is registration order,
//! and re-registering an id replaces the definition in place.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::config::ConfigObject;
use crate::plugin::Plugin;
use crate::rules::RuleDefinition;
use crate::transform::{ItemType, Transformer};

/// Insertion-ordered id map
struct Slots<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, id: &str, item: T) {
        if self.items.insert(id.to_string(), item).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.items.remove(id).is_some() {
            self.order.retain(|o| o != id);
            true
        } else {
            false
        }
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// What a plugin contributed when it was registered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisteredPlugin {
    pub id: String,
    pub rules: Vec<String>,
    pub transformers: Vec<String>,
    pub presets: Vec<String>,
}

/// Which plugin last registered each definition
///
/// Definitions registered directly (not through a plugin) have no owner.
#[derive(Default)]
struct Owners {
    rules: HashMap<String, String>,
    transformers: HashMap<String, String>,
    presets: HashMap<String, String>,
    defaults: HashMap<ItemType, String>,
}

#[derive(Default)]
pub struct Registry {
    rules: Slots<Arc<dyn RuleDefinition>>,
    transformers: Slots<Arc<dyn Transformer>>,
    presets: BTreeMap<String, ConfigObject>,
    defaults: HashMap<ItemType, String>,
    plugins: Slots<RegisteredPlugin>,
    owners: Owners,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_rule(&mut self, rule: Arc<dyn RuleDefinition>) {
        let id = rule.id().to_string();
        self.owners.rules.remove(&id);
        self.rules.insert(&id, rule);
    }

    pub fn register_transformer(&mut self, transformer: Arc<dyn Transformer>) {
        let id = transformer.id().to_string();
        self.owners.transformers.remove(&id);
        self.transformers.insert(&id, transformer);
    }

    pub fn register_preset(&mut self, name: impl Into<String>, preset: ConfigObject) {
        let name = name.into();
        self.owners.presets.remove(&name);
        self.presets.insert(name, preset);
    }

    /// Transformer appended to chains whose output is not `end_type`
    pub fn set_default_transformer(&mut self, end_type: ItemType, transformer_id: impl Into<String>) {
        self.owners.defaults.remove(&end_type);
        self.defaults.insert(end_type, transformer_id.into());
    }

    /// Remove rules and transformers by id; returns how many were removed
    pub fn deregister<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let mut removed = 0;
        for id in ids {
            let id = id.as_ref();
            removed += usize::from(self.rules.remove(id));
            removed += usize::from(self.transformers.remove(id));
            self.owners.rules.remove(id);
            self.owners.transformers.remove(id);
        }
        removed
    }

    pub fn rule(&self, id: &str) -> Option<Arc<dyn RuleDefinition>> {
        self.rules.get(id).cloned()
    }

    pub fn transformer(&self, id: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(id).cloned()
    }

    pub fn preset(&self, name: &str) -> Option<&ConfigObject> {
        self.presets.get(name)
    }

    pub fn default_transformer(&self, end_type: ItemType) -> Option<Arc<dyn Transformer>> {
        self.defaults
            .get(&end_type)
            .and_then(|id| self.transformer(id))
    }

    /// Rules in registration order
    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn RuleDefinition>> {
        self.rules.values()
    }

    /// Transformers in registration order
    pub fn transformers(&self) -> impl Iterator<Item = &Arc<dyn Transformer>> {
        self.transformers.values()
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.ids().collect()
    }

    pub fn transformer_ids(&self) -> Vec<&str> {
        self.transformers.ids().collect()
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// Transformers that can directly follow a stage producing `output`
    pub fn compatible_transformers(&self, output: ItemType) -> Vec<&str> {
        self.transformers()
            .filter(|t| t.input_type() == output)
            .map(|t| t.id())
            .collect()
    }

    /// Register everything a plugin contributes
    ///
    /// Registering the same plugin again replaces its definitions in place
    /// and drops ids it no longer contributes, so the registry ends up the
    /// same as after a single registration. A definition this plugin
    /// overwrites now belongs to it; one a later registration overwrites
    /// no longer does.
    pub fn register_plugin(&mut self, plugin: Plugin) -> RegisteredPlugin {
        let previous = self.plugins.get(&plugin.id).cloned();
        let owner = plugin.id.clone();
        let mut record = RegisteredPlugin {
            id: plugin.id.clone(),
            ..Default::default()
        };
        for rule in plugin.rules {
            let id = rule.id().to_string();
            self.register_rule(rule);
            self.owners.rules.insert(id.clone(), owner.clone());
            record.rules.push(id);
        }
        for transformer in plugin.transformers {
            let id = transformer.id().to_string();
            self.register_transformer(transformer);
            self.owners.transformers.insert(id.clone(), owner.clone());
            record.transformers.push(id);
        }
        for (name, preset) in plugin.presets {
            let name = format!("{}:{}", plugin.id, name);
            self.register_preset(name.clone(), preset);
            self.owners.presets.insert(name.clone(), owner.clone());
            record.presets.push(name);
        }
        let mut defaults = Vec::new();
        for (end_type, transformer_id) in plugin.defaults {
            self.set_default_transformer(end_type, transformer_id);
            self.owners.defaults.insert(end_type, owner.clone());
            defaults.push(end_type);
        }
        if let Some(previous) = previous {
            let stale = RegisteredPlugin {
                id: previous.id,
                rules: previous
                    .rules
                    .into_iter()
                    .filter(|id| !record.rules.contains(id))
                    .collect(),
                transformers: previous
                    .transformers
                    .into_iter()
                    .filter(|id| !record.transformers.contains(id))
                    .collect(),
                presets: previous
                    .presets
                    .into_iter()
                    .filter(|name| !record.presets.contains(name))
                    .collect(),
            };
            self.remove_owned(&stale);
            let stale_defaults: Vec<ItemType> = self
                .owners
                .defaults
                .iter()
                .filter(|(end_type, o)| **o == owner && !defaults.contains(*end_type))
                .map(|(end_type, _)| *end_type)
                .collect();
            for end_type in stale_defaults {
                self.owners.defaults.remove(&end_type);
                self.defaults.remove(&end_type);
            }
        }
        self.plugins.insert(&record.id, record.clone());
        record
    }

    /// Remove plugins and every definition they still own
    ///
    /// Ids another plugin (or a direct `register_*` call) overwrote after
    /// this plugin registered them are left in place.
    pub fn deregister_plugins<S: AsRef<str>>(&mut self, plugin_ids: &[S]) -> Vec<RegisteredPlugin> {
        let mut removed = Vec::new();
        for plugin_id in plugin_ids {
            let Some(record) = self.plugins.get(plugin_id.as_ref()).cloned() else {
                continue;
            };
            self.plugins.remove(&record.id);
            self.remove_owned(&record);
            let owned_defaults: Vec<ItemType> = self
                .owners
                .defaults
                .iter()
                .filter(|(_, o)| **o == record.id)
                .map(|(end_type, _)| *end_type)
                .collect();
            for end_type in owned_defaults {
                self.owners.defaults.remove(&end_type);
                self.defaults.remove(&end_type);
            }
            removed.push(record);
        }
        removed
    }

    /// Drop the definitions listed in `record` that `record.id` still owns
    fn remove_owned(&mut self, record: &RegisteredPlugin) {
        let owner = Some(&record.id);
        for id in &record.rules {
            if self.owners.rules.get(id) == owner {
                self.owners.rules.remove(id);
                self.rules.remove(id);
            }
        }
        for id in &record.transformers {
            if self.owners.transformers.get(id) == owner {
                self.owners.transformers.remove(id);
                self.transformers.remove(id);
            }
        }
        for name in &record.presets {
            if self.owners.presets.get(name) == owner {
                self.owners.presets.remove(name);
                self.presets.remove(name);
            }
        }
    }

    pub fn is_plugin_registered(&self, plugin_id: &str) -> bool {
        self.plugins.get(plugin_id).is_some()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.values()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("rules", &self.rule_ids())
            .field("transformers", &self.transformer_ids())
            .field("presets", &self.preset_names())
            .finish()
    }
}
