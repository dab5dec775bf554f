//! `stack-hash`: fingerprint a report's JavaScript stack.
//!
//! Frames are normalized before hashing (line and column numbers dropped)
//! so the same failure at slightly shifted source positions hashes alike.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "stack-hash";

const STACK_PATH: &str = "javascriptStack.stack";

static LINE_COL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\d+:\d+").expect("line/column regex must compile"));

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StackHashOptions {}

pub struct StackHash;

impl Transformer for StackHash {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Compute a hash of the JavaScript stack for grouping similar failures"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Report
    }

    fn output_type(&self) -> ItemType {
        ItemType::Object
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        parse_options::<StackHashOptions>(ID, options)?;
        Ok(Box::new(StackHashStage))
    }
}

/// Hex SHA-256 of the normalized frames, one frame per line
pub fn hash_frames<'a>(frames: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for frame in frames {
        hasher.update(LINE_COL.replace_all(frame.trim(), "").as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

struct StackHashStage;

impl Stage for StackHashStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let report = item.into_report(ID)?;
        let frames: Vec<&str> = report
            .require(STACK_PATH)?
            .as_array()
            .map(|frames| frames.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let out = json!({
            "dumpEventTimestamp": report.get("header.dumpEventTimestamp").cloned().unwrap_or(Value::Null),
            "filename": report.filename(),
            "message": report.get("javascriptStack.message").cloned().unwrap_or(Value::Null),
            "stackHash": hash_frames(frames),
        });
        Ok(vec![Item::Object(out)])
    }
}
