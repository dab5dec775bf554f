//! `csv`: render objects as CSV rows.
//!
//! The first object fixes the columns; a header row is emitted once, ahead
//! of the first data row. Escaping follows RFC 4180.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::flatten;
use crate::errors::Result;
use crate::rules::Options;
use crate::transform::{parse_options, Item, ItemType, Stage, Transformer};

pub const ID: &str = "csv";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CsvOptions {
    /// Nested values become dotted-path columns; otherwise JSON text
    #[serde(default = "yes")]
    flatten: bool,
    #[serde(default = "yes")]
    header: bool,
}

fn yes() -> bool {
    true
}

pub struct Csv;

impl Transformer for Csv {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Render as CSV, one row per object"
    }

    fn input_type(&self) -> ItemType {
        ItemType::Object
    }

    fn output_type(&self) -> ItemType {
        ItemType::String
    }

    fn transform(&self, options: &Options) -> Result<Box<dyn Stage>> {
        let options: CsvOptions = parse_options(ID, options)?;
        Ok(Box::new(CsvStage {
            flatten: options.flatten,
            header: options.header,
            columns: None,
        }))
    }
}

struct CsvStage {
    flatten: bool,
    header: bool,
    columns: Option<Vec<String>>,
}

impl CsvStage {
    fn fields(&self, value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) if !self.flatten => map,
            Value::Object(_) | Value::Array(_) => flatten(&value),
            leaf => {
                let mut map = Map::new();
                map.insert("value".to_string(), leaf);
                map
            }
        }
    }
}

impl Stage for CsvStage {
    fn process(&mut self, item: Item) -> Result<Vec<Item>> {
        let fields = self.fields(item.into_object(ID)?);
        let mut out = Vec::with_capacity(2);
        if self.columns.is_none() {
            let columns: Vec<String> = fields.keys().cloned().collect();
            if self.header {
                out.push(Item::String(render_row(columns.iter().map(String::as_str))));
            }
            self.columns = Some(columns);
        }
        let columns = self.columns.as_deref().unwrap_or_default();
        let cells: Vec<String> = columns
            .iter()
            .map(|c| fields.get(c).map(cell).unwrap_or_default())
            .collect();
        out.push(Item::String(render_row(cells.iter().map(String::as_str))));
        Ok(out)
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(escape_csv_field).collect::<Vec<_>>().join(",")
}

/// Quote fields containing commas, quotes or line breaks; double inner quotes
fn escape_csv_field(s: &str) -> String {
    let needs_quoting = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if needs_quoting {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: Vec<Item>) -> Vec<String> {
        items
            .into_iter()
            .map(|i| match i {
                Item::String(s) => s,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_header_emitted_once() {
        let mut stage = Csv.transform(&Options::new()).unwrap();
        let first = strings(
            stage
                .process(Item::Object(json!({"name": "a", "usage": {"cpu": 1}})))
                .unwrap(),
        );
        assert_eq!(first, vec!["name,usage.cpu", "a,1"]);
        let second = strings(stage.process(Item::Object(json!({"usage": {"cpu": 2}}))).unwrap());
        assert_eq!(second, vec![",2"]);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_unflattened_nested_values_are_json() {
        let mut options = Options::new();
        options.insert("flatten".into(), json!(false));
        options.insert("header".into(), json!(false));
        let mut stage = Csv.transform(&options).unwrap();
        let out = strings(stage.process(Item::Object(json!({"a": [1, 2]}))).unwrap());
        assert_eq!(out, vec!["\"[1,2]\""]);
    }
}
