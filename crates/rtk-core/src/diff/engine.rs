//! Lazy depth-first diff walk.
//!
//! The walker keeps an explicit stack of frames, one per container being
//! compared, and yields each difference as soon as it is found. Containers
//! are only expanded when their values differ, so equal subtrees cost one
//! comparison.

use serde_json::Value;

use crate::diff::model::{DiffOptions, DiffResult};
use crate::errors::{Result, RtkError};
use crate::path::{self, PathFilter};
use crate::report::Report;
use crate::stream::StopSignal;

/// Pending children of one container present on both sides
struct Frame<'a> {
    depth: usize,
    children: std::vec::IntoIter<(String, Option<&'a Value>, Option<&'a Value>)>,
}

/// Iterator of differences between two trees
pub struct DiffWalker<'a> {
    stack: Vec<Frame<'a>>,
    filter: PathFilter,
    max_depth: usize,
    signal: StopSignal,
    failed: bool,
}

impl<'a> DiffWalker<'a> {
    pub fn new(old: &'a Value, new: &'a Value, options: &DiffOptions) -> Self {
        let mut walker = Self {
            stack: Vec::new(),
            filter: PathFilter::new(options.filter_properties.iter()),
            max_depth: options.max_depth,
            signal: StopSignal::new(),
            failed: false,
        };
        walker.push("", 0, old, new);
        walker
    }

    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }

    fn push(&mut self, at: &str, depth: usize, old: &'a Value, new: &'a Value) {
        let children = match (old, new) {
            (Value::Object(o), Value::Object(n)) => n
                .iter()
                .map(|(k, nv)| (path::join(at, k), o.get(k), Some(nv)))
                .chain(
                    o.iter()
                        .filter(|(k, _)| !n.contains_key(*k))
                        .map(|(k, ov)| (path::join(at, k), Some(ov), None)),
                )
                .collect::<Vec<_>>(),
            (Value::Array(o), Value::Array(n)) => (0..o.len().max(n.len()))
                .map(|i| (path::join_index(at, i), o.get(i), n.get(i)))
                .collect(),
            _ => Vec::new(),
        };
        self.stack.push(Frame {
            depth,
            children: children.into_iter(),
        });
    }

    fn step(&mut self) -> Option<Result<DiffResult>> {
        loop {
            let frame = self.stack.last_mut()?;
            let depth = frame.depth;
            let Some((at, old, new)) = frame.children.next() else {
                self.stack.pop();
                continue;
            };
            if self.filter.matches(&at) {
                continue;
            }
            match (old, new) {
                (None, Some(n)) => return Some(Ok(DiffResult::add(at, n.clone()))),
                (Some(o), None) => return Some(Ok(DiffResult::remove(at, o.clone()))),
                (Some(o), Some(n)) if o == n => continue,
                (Some(o @ Value::Object(_)), Some(n @ Value::Object(_)))
                | (Some(o @ Value::Array(_)), Some(n @ Value::Array(_))) => {
                    if depth + 1 > self.max_depth {
                        return Some(Err(RtkError::DiffDepthExceeded {
                            path: at,
                            max_depth: self.max_depth,
                        }
                        .into()));
                    }
                    self.push(&at, depth + 1, o, n);
                }
                (Some(o), Some(n)) => {
                    return Some(Ok(DiffResult::replace(at, o.clone(), n.clone())))
                }
                (None, None) => continue,
            }
        }
    }
}

impl Iterator for DiffWalker<'_> {
    type Item = Result<DiffResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.signal.is_stopped() {
            return None;
        }
        let item = self.step();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Diff two JSON trees
pub fn diff_values<'a>(old: &'a Value, new: &'a Value, options: &DiffOptions) -> DiffWalker<'a> {
    DiffWalker::new(old, new, options)
}

/// Diff two reports as they are
///
/// Redaction is not applied here: two placeholders compare equal whatever
/// secrets they replaced.
///
/// # Errors
///
/// Returns `InvalidReport` if either report root is not an object.
pub fn diff_reports<'a>(
    report1: &'a Report,
    report2: &'a Report,
    options: &DiffOptions,
) -> Result<DiffWalker<'a>> {
    for report in [report1, report2] {
        if !report.root().is_object() {
            return Err(RtkError::InvalidReport {
                reason: format!("{} is not an object", report.display_name()),
            }
            .into());
        }
    }
    Ok(diff_values(report1.root(), report2.root(), options))
}
