//! `json`: serialize each object to JSON text.

use serde::Deserialize;

use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "json";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonOptions {
    #[serde(default)]
    pretty: bool,
}

pub struct Json;

impl Transformer for Json {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Serialize to JSON"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Object
    }

    fn output_type(&self) -> ItemType {
        ItemType::String
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        let options: JsonOptions = parse_options(ID, options)?;
        Ok(Box::new(JsonStage {
            pretty: options.pretty,
        }))
    }
}

struct JsonStage {
    pretty: bool,
}

impl Stage for JsonStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let value = item.into_object(ID)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(vec![Item::String(text)])
    }
}
