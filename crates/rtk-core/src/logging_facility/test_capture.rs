//! Test capture mode for deterministic logging assertions
//!
//! A layer that records every event in memory so tests can assert on the
//! start/end/error events an engine run produced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use rtk_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, FIELD_COMPONENT, FIELD_EVENT, FIELD_OP, FIELD_RUN_ID,
};

/// A captured log event with all its fields rendered as strings
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub component: Option<String>,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    /// The `run_id` field, if the event carried one
    pub fn run_id(&self) -> Option<&str> {
        self.fields.get(FIELD_RUN_ID).map(String::as_str)
    }

    fn is_terminal(&self) -> bool {
        matches!(self.event.as_deref(), Some(EVENT_END) | Some(EVENT_END_ERROR))
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

/// Layer that pushes every event into a shared buffer
pub struct TestCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let layer = Self {
            events: events.clone(),
        };
        (layer, TestCapture { events })
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            component: visitor.fields.get(FIELD_COMPONENT).cloned(),
            op: visitor.fields.get(FIELD_OP).cloned(),
            event: visitor.fields.get(FIELD_EVENT).cloned(),
            fields: visitor.fields,
        };

        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

/// Handle for reading captured events in tests
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// All captured events, oldest first
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events for one operation name
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op.as_deref() == Some(op))
            .collect()
    }

    /// Events stamped with one run id, across all operations
    pub fn events_for_run(&self, run_id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.run_id() == Some(run_id))
            .collect()
    }

    /// Assert that an event exists with the given operation and event type
    ///
    /// # Panics
    ///
    /// Panics if the event is not found
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        let found = events
            .iter()
            .any(|e| e.op.as_deref() == Some(op) && e.event.as_deref() == Some(event));
        assert!(
            found,
            "Expected event op={} event={} not found in {} captured events",
            op,
            event,
            events.len()
        );
    }

    /// Assert that every run of `op` that started also ended exactly once
    ///
    /// # Panics
    ///
    /// Panics if some run id has a start but no (or more than one) terminal event
    pub fn assert_runs_closed(&self, op: &str) {
        let events = self.events_for_op(op);
        let mut open: HashMap<String, i32> = HashMap::new();
        for e in &events {
            let Some(run) = e.run_id() else { continue };
            let slot = open.entry(run.to_string()).or_insert(0);
            if e.is_terminal() {
                *slot -= 1;
            } else {
                *slot += 1;
            }
        }
        for (run, balance) in open {
            assert_eq!(balance, 0, "run {} of op {} is not closed", run, op);
        }
    }

    /// Count events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the global subscriber (once per process)
///
/// Tests in one binary share the buffer, so filter by op name or run id.
///
/// # Example
///
/// ```
/// use rtk_core::logging_facility::test_capture::init_test_capture;
/// use rtk_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("my_operation");
/// capture.assert_event_exists("my_operation", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(op: &str, kind: &str, run: &str) -> CapturedEvent {
        let mut fields = HashMap::new();
        fields.insert(FIELD_RUN_ID.to_string(), run.to_string());
        CapturedEvent {
            level: Level::INFO,
            component: None,
            op: Some(op.to_string()),
            event: Some(kind.to_string()),
            fields,
        }
    }

    #[test]
    fn test_run_id_accessor() {
        let e = event("diff", "start", "r1");
        assert_eq!(e.run_id(), Some("r1"));
        assert!(!e.is_terminal());
        assert!(event("diff", EVENT_END_ERROR, "r1").is_terminal());
    }

    #[test]
    fn test_runs_closed_balanced() {
        let (_layer, capture) = TestCaptureLayer::new();
        {
            let mut events = capture.events.lock().unwrap();
            events.push(event("diff", "start", "r1"));
            events.push(event("diff", EVENT_END, "r1"));
        }
        capture.assert_runs_closed("diff");
        assert_eq!(capture.events_for_run("r1").len(), 2);
    }
}
