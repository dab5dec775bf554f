//! `redact`: re-apply secret redaction to reports built with secrets shown.

use serde::Deserialize;

use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "redact";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RedactOptions {}

pub struct Redact;

impl Transformer for Redact {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Redact secrets from reports"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Report
    }

    fn output_type(&self) -> ItemType {
        ItemType::Report
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        parse_options::<RedactOptions>(ID, options)?;
        Ok(Box::new(RedactStage))
    }
}

struct RedactStage;

impl Stage for RedactStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let report = item.into_report(ID)?;
        Ok(vec![Item::Report(report.to_redacted())])
    }
}
