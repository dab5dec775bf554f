//! Pull-based sequence plumbing shared by the engines.
//!
//! Every engine exposes its output as an `Iterator` of `Result` items: the
//! consumer pulls one item at a time and nothing runs ahead of it. A
//! [`StopSignal`] lets a consumer tell upstream producers to stop before the
//! sequence is exhausted; dropping the iterator has the same effect.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{ExError, Result};

/// Shared "stop requested" flag for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that producers stop; idempotent
    pub fn stop(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Iterator adaptor that ends the sequence once its signal is stopped
///
/// The inner iterator is never polled after the stop, so an upstream that
/// does I/O per item performs no further reads.
#[derive(Debug)]
pub struct Cancellable<I> {
    inner: I,
    signal: StopSignal,
}

impl<I: Iterator> Iterator for Cancellable<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.signal.is_stopped() {
            return None;
        }
        self.inner.next()
    }
}

/// Iterator adaptor that ends the sequence right after the first error
///
/// Used where a per-item failure aborts the rest of the call (diff,
/// transform).
#[derive(Debug)]
pub struct FailFast<I> {
    inner: I,
    failed: bool,
}

impl<T, I> Iterator for FailFast<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next()?;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Adaptors available on every iterator
pub trait StreamExt: Iterator + Sized {
    fn until_stopped(self, signal: &StopSignal) -> Cancellable<Self> {
        Cancellable {
            inner: self,
            signal: signal.clone(),
        }
    }

    fn fail_fast<T>(self) -> FailFast<Self>
    where
        Self: Iterator<Item = Result<T>>,
    {
        FailFast {
            inner: self,
            failed: false,
        }
    }
}

impl<I: Iterator> StreamExt for I {}

/// Boxed pull-based sequence, the currency between pipeline stages
pub type BoxStream<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Materialize a sequence, failing on the first error
///
/// Nothing after the failing item is pulled.
///
/// # Errors
///
/// Returns the first error the sequence yields.
pub fn collect_all<T>(items: impl IntoIterator<Item = Result<T>>) -> Result<Vec<T>> {
    items.into_iter().collect()
}

/// Items and errors gathered by [`collect_best_effort`]
#[derive(Debug, Clone)]
pub struct BestEffort<T> {
    pub items: Vec<T>,
    pub errors: Vec<ExError>,
}

impl<T> BestEffort<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Materialize a sequence, keeping partial results alongside every error
pub fn collect_best_effort<T>(items: impl IntoIterator<Item = Result<T>>) -> BestEffort<T> {
    let mut out = BestEffort {
        items: Vec::new(),
        errors: Vec::new(),
    };
    for item in items {
        match item {
            Ok(v) => out.items.push(v),
            Err(e) => out.errors.push(e),
        }
    }
    out
}

/// Total order over optional JSON values, used for sorting results
///
/// Absent < null < bool < number < string < array < object. Arrays and
/// objects compare by their serialized text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let rank = type_rank(a).cmp(&type_rank(b));
            if rank != Ordering::Equal {
                return rank;
            }
            match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Null, Value::Null) => Ordering::Equal,
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_stop_signal_halts_upstream_pulls() {
        let pulled = Cell::new(0);
        let signal = StopSignal::new();
        let source = (0..100).inspect(|_| pulled.set(pulled.get() + 1));
        let mut stream = source.until_stopped(&signal);

        assert_eq!(stream.next(), Some(0));
        assert_eq!(stream.next(), Some(1));
        signal.stop();
        assert_eq!(stream.next(), None);
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_fail_fast_stops_after_error() {
        let items: Vec<Result<i32>> = vec![
            Ok(1),
            Err(ExError::new(ExErrorKind::Internal)),
            Ok(3),
        ];
        let out: Vec<_> = items.into_iter().fail_fast().collect();
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }

    #[test]
    fn test_collect_all_and_best_effort() {
        let ok: Vec<Result<i32>> = vec![Ok(1), Ok(2)];
        assert_eq!(collect_all(ok).unwrap(), vec![1, 2]);

        let mixed: Vec<Result<i32>> = vec![Ok(1), Err(ExError::new(ExErrorKind::Io)), Ok(3)];
        assert!(collect_all(mixed.clone()).is_err());

        let partial = collect_best_effort(mixed);
        assert_eq!(partial.items, vec![1, 3]);
        assert_eq!(partial.errors.len(), 1);
        assert!(!partial.is_clean());
    }

    #[test]
    fn test_compare_values_orders_types_then_values() {
        assert_eq!(compare_values(None, Some(&json!(null))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10.5))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!(true)), Some(&json!("a"))),
            Ordering::Less
        );
    }
}
