//! `newline`: terminate each string with a line ending.

use serde::Deserialize;

use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "newline";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NewlineOptions {
    #[serde(default = "default_eol")]
    eol: String,
}

fn default_eol() -> String {
    "\n".to_string()
}

pub struct Newline;

impl Transformer for Newline {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Append a line ending to each string"
    }

    fn input_type(&self) -> ItemType {
        ItemType::String
    }

    fn output_type(&self) -> ItemType {
        ItemType::String
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        let options: NewlineOptions = parse_options(ID, options)?;
        Ok(Box::new(NewlineStage { eol: options.eol }))
    }
}

struct NewlineStage {
    eol: String,
}

impl Stage for NewlineStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let mut text = item.into_string(ID)?;
        text.push_str(&self.eol);
        Ok(vec![Item::String(text)])
    }
}
