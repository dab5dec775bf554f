//! `numeric`: reduce an object to its numeric leaves.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::flatten;
use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "numeric";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NumericOptions {}

pub struct Numeric;

impl Transformer for Numeric {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Keep only numeric values, keyed by path"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Object
    }

    fn output_type(&self) -> ItemType {
        ItemType::Object
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        parse_options::<NumericOptions>(ID, options)?;
        Ok(Box::new(NumericStage))
    }
}

struct NumericStage;

impl Stage for NumericStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let value = item.into_object(ID)?;
        let numbers: Map<String, Value> = flatten(&value)
            .into_iter()
            .filter(|(_, v)| v.is_number())
            .collect();
        Ok(vec![Item::Object(Value::Object(numbers))])
    }
}
