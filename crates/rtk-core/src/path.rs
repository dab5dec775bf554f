//! Dotted property paths into report trees.
//!
//! A path is property names joined with `.`; array elements use their
//! decimal index as the segment (`sharedObjects.3`). The empty path is the
//! root.

use serde_json::Value;

/// Append an object key to a path
pub fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Append an array index to a path
pub fn join_index(parent: &str, index: usize) -> String {
    join(parent, &index.to_string())
}

/// Resolve `path` against `root`
///
/// Object segments are looked up by key; array segments must parse as an
/// index. Returns `None` as soon as a segment does not resolve.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set of path prefixes / property names excluded from a walk
///
/// An entry matches a path when it is equal to it, when it is a
/// segment-aligned prefix of it, or (for entries without a `.`) when it
/// equals the path's final segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    entries: Vec<String>,
}

impl PathFilter {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .filter(|e: &String| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry_matches(entry, path))
    }
}

fn entry_matches(entry: &str, path: &str) -> bool {
    if path == entry {
        return true;
    }
    if let Some(rest) = path.strip_prefix(entry) {
        if rest.starts_with('.') {
            return true;
        }
    }
    !entry.contains('.') && path.rsplit('.').next() == Some(entry)
}
