//! `library-mismatch`: find shared libraries whose version disagrees with the
//! component version the runtime reports.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_options, Options, RuleDefinition, RuleDocs, RuleInstance, RuleMeta};
use crate::errors::Result;
use crate::message::Finding;
use crate::report::Report;

pub const ID: &str = "library-mismatch";

static VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)+[a-z]?)").expect("library version regex must compile")
});

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryMismatchOptions {
    /// Component names never checked
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Flags shared objects whose embedded version differs from the matching
/// entry in `header.componentVersions`
///
/// A report yields at most one finding from `next`. When several libraries
/// conflict, that finding's message joins their descriptions with `"; "` and
/// `data.conflicts` lists each one. Conflicts are not deferred to `complete`,
/// which has no report to attribute them to.
pub struct LibraryMismatch {
    meta: RuleMeta,
}

impl LibraryMismatch {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta {
                docs: RuleDocs {
                    category: "runtime".to_string(),
                    description: "Identify potential library version mismatches".to_string(),
                    url: None,
                },
                schema: json!({
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "ignore": {"type": "array", "items": {"type": "string"}, "minItems": 1}
                    }
                }),
                constants: BTreeMap::new(),
            },
        }
    }
}

impl Default for LibraryMismatch {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleDefinition for LibraryMismatch {
    fn id(&self) -> &str {
        ID
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inspect(&self, options: &Options) -> Result<Box<dyn RuleInstance>> {
        let options: LibraryMismatchOptions = parse_options(ID, options)?;
        Ok(Box::new(LibraryMismatchInstance {
            ignore: options.ignore.into_iter().collect(),
        }))
    }
}

struct LibraryMismatchInstance {
    ignore: BTreeSet<String>,
}

/// One shared object conflicting with a component version
#[derive(Debug, Clone, PartialEq)]
struct Conflict {
    library: String,
    component: String,
    version: String,
    library_version: String,
}

impl Conflict {
    fn describe(&self) -> String {
        format!(
            "Custom shared library at {} in use conflicting with {}@{}",
            self.library, self.component, self.version
        )
    }
}

impl LibraryMismatchInstance {
    fn conflicts(&self, context: &Report) -> Result<Vec<Conflict>> {
        let versions = context
            .require("header.componentVersions")?
            .as_object()
            .cloned()
            .unwrap_or_default();
        let libraries: Vec<&str> = context
            .require("sharedObjects")?
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut found = Vec::new();
        for (component, version) in versions.iter() {
            if self.ignore.contains(component) {
                continue;
            }
            let Some(version) = version.as_str() else {
                continue;
            };
            for library in libraries.iter().filter(|l| l.contains(component.as_str())) {
                let Some(library_version) = VERSION.captures(library).map(|c| c[1].to_string())
                else {
                    continue;
                };
                if library_version != version {
                    found.push(Conflict {
                        library: library.to_string(),
                        component: component.clone(),
                        version: version.to_string(),
                        library_version,
                    });
                }
            }
        }
        Ok(found)
    }
}

impl RuleInstance for LibraryMismatchInstance {
    fn next(&mut self, context: &Report) -> Result<Option<Finding>> {
        let conflicts = self.conflicts(context)?;
        if conflicts.is_empty() {
            return Ok(None);
        }
        let text = conflicts
            .iter()
            .map(Conflict::describe)
            .collect::<Vec<_>>()
            .join("; ");
        let data = conflicts
            .iter()
            .map(|c| {
                json!({
                    "library": c.library,
                    "component": c.component,
                    "version": c.version,
                    "libraryVersion": c.library_version,
                })
            })
            .collect::<Vec<_>>();
        Ok(Some(
            Finding::new(text).with_data(json!({ "conflicts": data })),
        ))
    }
}
