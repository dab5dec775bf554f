//! `filter`: keep or drop subtrees of a report by path.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::OneOrMany;
use crate::errors::Result;
use crate::path::{self, PathFilter};
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "filter";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterOptions {
    /// Paths to keep; everything when absent
    #[serde(default)]
    include: Option<OneOrMany>,
    /// Paths (or bare property names) to drop
    #[serde(default)]
    exclude: Option<OneOrMany>,
}

pub struct Filter;

impl Transformer for Filter {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Pick or omit properties by path"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Report
    }

    fn output_type(&self) -> ItemType {
        ItemType::Object
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        let options: FilterOptions = parse_options(ID, options)?;
        Ok(Box::new(FilterStage {
            include: options.include.map(OneOrMany::into_vec).unwrap_or_default(),
            exclude: PathFilter::new(options.exclude.map(OneOrMany::into_vec).unwrap_or_default()),
        }))
    }
}

struct FilterStage {
    include: Vec<String>,
    exclude: PathFilter,
}

impl FilterStage {
    fn covered(&self, at: &str) -> bool {
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|entry| at == entry || at.starts_with(&format!("{}.", entry)))
    }

    fn leads_to_include(&self, at: &str) -> bool {
        at.is_empty()
            || self
                .include
                .iter()
                .any(|entry| entry.starts_with(&format!("{}.", at)))
    }

    fn select(&self, value: &Value, at: &str, covered: bool) -> Option<Value> {
        if !at.is_empty() && self.exclude.matches(at) {
            return None;
        }
        let covered = covered || self.covered(at);
        if !covered && !self.leads_to_include(at) {
            return None;
        }
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    if let Some(kept) = self.select(child, &path::join(at, key), covered) {
                        out.insert(key.clone(), kept);
                    }
                }
                (covered || !out.is_empty()).then_some(Value::Object(out))
            }
            Value::Array(items) if covered => Some(Value::Array(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, child)| self.select(child, &path::join_index(at, i), true))
                    .collect(),
            )),
            Value::Array(items) => {
                let mut out = Map::new();
                for (i, child) in items.iter().enumerate() {
                    if let Some(kept) = self.select(child, &path::join_index(at, i), false) {
                        out.insert(i.to_string(), kept);
                    }
                }
                (!out.is_empty()).then_some(Value::Object(out))
            }
            leaf if covered => Some(leaf.clone()),
            _ => None,
        }
    }
}

impl Stage for FilterStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let value = item.into_object(ID)?;
        let selected = self
            .select(&value, "", false)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(vec![Item::Object(selected)])
    }
}
