//! Pull-based inspection.
//!
//! Each pull runs at most one `next()` or `complete()` call of one rule
//! instance, so consumers that stop early leave the remaining rules and
//! reports untouched. For a (report, rule) pair, messages from `next()` are
//! emitted before the one from `complete()`.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::options::{ErrorPolicy, InspectOptions, InspectScope, SortDirection};
use crate::config::{merge_options, Config};
use crate::errors::{ExError, Result, RtkError};
use crate::message::{Finding, Message, Severity};
use crate::path;
use crate::registry::Registry;
use crate::report::Report;
use crate::rules::{Options, RuleDefinition, RuleInstance};
use crate::stream::{compare_values, BoxStream, StopSignal, StreamExt};

/// Rules to run, in registration order, with their effective options
///
/// A config that names no rules enables every registered rule. Entries in
/// `rule_config` enable their rule and override its options key by key.
///
/// # Errors
///
/// Returns `ConfigValidation` for a `rule_config` id that is not registered.
pub fn enabled_rules(
    registry: &Registry,
    config: &Config,
    options: &InspectOptions,
) -> Result<Vec<(Arc<dyn RuleDefinition>, Options)>> {
    if let Some(unknown) = options
        .rule_config
        .keys()
        .find(|id| registry.rule(id).is_none())
    {
        return Err(RtkError::UnknownRule {
            rule_id: unknown.clone(),
        }
        .into());
    }
    let mut enabled = Vec::new();
    for rule in registry.rules() {
        let configured = config.rules.get(rule.id());
        let overrides = options.rule_config.get(rule.id());
        let on = overrides.is_some()
            || match configured {
                Some(c) => c.enabled,
                None => !config.filters_rules(),
            };
        if !on {
            continue;
        }
        let mut rule_options = configured.map(|c| c.options.clone()).unwrap_or_default();
        if let Some(overrides) = overrides {
            merge_options(&mut rule_options, overrides);
        }
        enabled.push((Arc::clone(rule), rule_options));
    }
    Ok(enabled)
}

struct EnabledRule {
    definition: Arc<dyn RuleDefinition>,
    options: Options,
    /// Aggregate scope only; `None` once the instance failed
    shared: Option<Box<dyn RuleInstance>>,
}

enum Phase {
    /// Pull the next report
    Report,
    /// Feed `current` to rule `cursor`
    Rule,
    /// Call `complete()` on the instance that just saw `current`
    Complete(usize, Box<dyn RuleInstance>),
    /// Aggregate scope: call `complete()` on rule `cursor`
    Finish,
    Done,
}

/// Emitted message plus the report it came from, for sort fallbacks
struct Emitted {
    message: Message,
    report: Option<Report>,
}

/// Lazy message sequence of one inspection call
pub struct Inspector<'a> {
    reports: BoxStream<'a, Report>,
    rules: Vec<EnabledRule>,
    threshold: Severity,
    policy: ErrorPolicy,
    scope: InspectScope,
    redact: bool,
    current: Option<Report>,
    cursor: usize,
    phase: Phase,
    pending: VecDeque<Result<Emitted>>,
    signal: StopSignal,
}

impl<'a> Inspector<'a> {
    /// Prepare an inspection; rule options are checked before any report
    /// is pulled
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` for unknown rule ids or rejected options.
    pub fn new<I>(
        reports: I,
        registry: &Registry,
        config: &Config,
        options: &InspectOptions,
    ) -> Result<Self>
    where
        I: Iterator<Item = Result<Report>> + 'a,
    {
        let mut rules = Vec::new();
        for (definition, rule_options) in enabled_rules(registry, config, options)? {
            let instance = definition
                .inspect(&rule_options)
                .map_err(|e| with_rule(e, definition.id()))?;
            rules.push(EnabledRule {
                definition,
                options: rule_options,
                shared: (options.scope == InspectScope::Aggregate).then_some(instance),
            });
        }
        let signal = StopSignal::new();
        Ok(Self {
            reports: Box::new(reports.until_stopped(&signal)),
            rules,
            threshold: options.severity,
            policy: options.error_policy,
            scope: options.scope,
            redact: !options.show_secrets_unsafe,
            current: None,
            cursor: 0,
            phase: Phase::Report,
            pending: VecDeque::new(),
            signal,
        })
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.definition.id()).collect()
    }

    /// Stop pulling reports; already-buffered output is discarded
    pub fn stop(&mut self) {
        self.signal.stop();
        self.pending.clear();
        self.phase = Phase::Done;
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Materialize, then stably sort by `field`
    ///
    /// `field` is looked up in the message's JSON form first
    /// (`severity`, `ruleId`, `data.usage`, ...) and then in the report the
    /// message came from (`header.dumpEventTimestamp`).
    ///
    /// # Errors
    ///
    /// Returns the first error the inspection yields.
    pub fn collect_sorted(mut self, field: &str, direction: SortDirection) -> Result<Vec<Message>> {
        let mut keyed = Vec::new();
        while let Some(emitted) = self.pull() {
            let emitted = emitted?;
            let key = sort_key(&emitted, field);
            keyed.push((key, emitted.message));
        }
        keyed.sort_by(|(a, _), (b, _)| directed(compare_values(a.as_ref(), b.as_ref()), direction));
        Ok(keyed.into_iter().map(|(_, m)| m).collect())
    }

    fn pull(&mut self) -> Option<Result<Emitted>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.signal.is_stopped() {
                self.phase = Phase::Done;
            }
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Report => match self.reports.next() {
                    Some(Ok(report)) => {
                        self.current = Some(if self.redact {
                            report.to_redacted()
                        } else {
                            report
                        });
                        self.cursor = 0;
                        self.phase = Phase::Rule;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        self.current = None;
                        self.cursor = 0;
                        self.phase = match self.scope {
                            InspectScope::PerReport => Phase::Done,
                            InspectScope::Aggregate => Phase::Finish,
                        };
                    }
                },
                Phase::Rule => self.step_rule(),
                Phase::Complete(index, mut instance) => {
                    let outcome = instance.complete();
                    self.record(index, outcome);
                    self.phase = Phase::Rule;
                }
                Phase::Finish => {
                    if self.cursor >= self.rules.len() {
                        continue;
                    }
                    let index = self.cursor;
                    self.cursor += 1;
                    self.phase = Phase::Finish;
                    if let Some(mut instance) = self.rules[index].shared.take() {
                        let outcome = instance.complete();
                        self.record(index, outcome);
                    }
                }
            }
        }
    }

    fn step_rule(&mut self) {
        let Some(report) = self.current.clone() else {
            self.phase = Phase::Report;
            return;
        };
        if self.cursor >= self.rules.len() {
            self.phase = Phase::Report;
            return;
        }
        let index = self.cursor;
        self.cursor += 1;
        self.phase = Phase::Rule;
        match self.scope {
            InspectScope::PerReport => {
                let rule = &self.rules[index];
                let mut instance = match rule.definition.inspect(&rule.options) {
                    Ok(instance) => instance,
                    Err(e) => {
                        self.record(index, Err(e));
                        return;
                    }
                };
                let outcome = instance.next(&report);
                let failed = outcome.is_err();
                self.record(index, outcome);
                if !failed {
                    self.phase = Phase::Complete(index, instance);
                }
            }
            InspectScope::Aggregate => {
                let Some(instance) = self.rules[index].shared.as_mut() else {
                    return;
                };
                let outcome = instance.next(&report);
                if outcome.is_err() {
                    self.rules[index].shared = None;
                }
                self.record(index, outcome);
            }
        }
    }

    /// Turn one rule call's outcome into pending output
    fn record(&mut self, index: usize, outcome: Result<Option<Finding>>) {
        let rule_id = self.rules[index].definition.id().to_string();
        let report = self.current.clone();
        let filename = report.as_ref().and_then(|r| r.filename().map(str::to_string));
        match outcome {
            Ok(None) => {}
            Ok(Some(finding)) => {
                let message = Message::from_finding(finding, &rule_id, filename.as_deref());
                if message.severity >= self.threshold {
                    self.pending.push_back(Ok(Emitted { message, report }));
                }
            }
            Err(e) => {
                let mut e = with_rule(e, &rule_id);
                if e.filename().is_none() {
                    if let Some(name) = &filename {
                        e = e.with_filename(name.clone());
                    }
                }
                match self.policy {
                    ErrorPolicy::Degrade => {
                        warn!(
                            rule_id = %rule_id,
                            err.code = e.code(),
                            error = %e,
                            "rule failed; reporting as message"
                        );
                        let message = Message::from_error(&e, &rule_id, filename.as_deref());
                        if message.severity >= self.threshold {
                            self.pending.push_back(Ok(Emitted { message, report }));
                        }
                    }
                    ErrorPolicy::Strict => self.pending.push_back(Err(e)),
                }
            }
        }
    }
}

impl Iterator for Inspector<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull().map(|r| r.map(|e| e.message))
    }
}

fn with_rule(e: ExError, rule_id: &str) -> ExError {
    if e.rule_id().is_some() {
        e
    } else {
        e.with_rule_id(rule_id)
    }
}

fn sort_key(emitted: &Emitted, field: &str) -> Option<Value> {
    let message = serde_json::to_value(&emitted.message).ok()?;
    path::lookup(&message, field)
        .cloned()
        .or_else(|| emitted.report.as_ref().and_then(|r| r.get(field).cloned()))
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Stable sort of already-materialized messages by a path into their JSON form
pub fn sort_messages(messages: &mut [Message], field: &str, direction: SortDirection) {
    let keys: Vec<Option<Value>> = messages
        .iter()
        .map(|m| {
            serde_json::to_value(m)
                .ok()
                .and_then(|v| path::lookup(&v, field).cloned())
        })
        .collect();
    let mut order: Vec<usize> = (0..messages.len()).collect();
    order.sort_by(|&a, &b| {
        directed(
            compare_values(keys[a].as_ref(), keys[b].as_ref()),
            direction,
        )
    });
    let sorted: Vec<Message> = order.iter().map(|&i| messages[i].clone()).collect();
    messages.clone_from_slice(&sorted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::builtin_registry;
    use crate::report::ReportOptions;
    use serde_json::json;

    fn report(name: &str, percent: f64) -> Result<Report> {
        Report::from_value(
            json!({
                "header": {"cpus": [{}, {}], "componentVersions": {}},
                "resourceUsage": {"cpuConsumptionPercent": percent},
                "sharedObjects": []
            }),
            &ReportOptions::default().with_filename(name),
        )
    }

    #[test]
    fn test_pulls_reports_lazily() {
        let registry = builtin_registry();
        let pulled = std::cell::Cell::new(0);
        let source = (0..10).map(|i| {
            pulled.set(pulled.get() + 1);
            report(&format!("r{}.json", i), 25.0)
        });
        let mut inspector =
            Inspector::new(source, &registry, &Config::default(), &InspectOptions::default())
                .unwrap();
        let first = inspector.next().unwrap().unwrap();
        assert_eq!(first.rule_id, "cpu-usage");
        assert_eq!(pulled.get(), 1);
    }

    #[test]
    fn test_sort_messages_desc_is_stable() {
        let mut messages: Vec<Message> = [("a", 1.0), ("b", 3.0), ("c", 1.0)]
            .iter()
            .map(|(id, usage)| {
                Message::from_finding(
                    Finding::new("m").with_data(json!({"usage": usage})),
                    id,
                    None,
                )
            })
            .collect();
        sort_messages(&mut messages, "data.usage", SortDirection::Desc);
        let ids: Vec<_> = messages.iter().map(|m| m.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
