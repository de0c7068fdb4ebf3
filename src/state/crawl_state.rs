use crate::state::CycleOutcome;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Accumulated extracted-field map, keyed by field name
pub type FieldMap = Map<String, Value>;

/// Session-wide crawl state shared by all in-flight cycles
///
/// The coordinator keeps this behind a single lock; every mutation happens
/// while holding it. The frontier and the downloaded-document set carry
/// their own locks.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Fields reported by the oracle so far
    pub fields: FieldMap,

    /// Page records written this session
    pub pages_recorded: usize,

    /// Tally of finished cycles by outcome
    pub outcomes: BTreeMap<CycleOutcome, usize>,
}

impl CrawlState {
    /// Creates state whose field map starts with every tracked field empty
    pub fn new(tracked_fields: &[String]) -> Self {
        let fields = tracked_fields
            .iter()
            .map(|name| (name.clone(), Value::Array(Vec::new())))
            .collect();

        Self {
            fields,
            ..Self::default()
        }
    }

    /// Merges oracle updates into the field map, last write wins per key
    pub fn merge_fields(&mut self, updates: FieldMap) {
        for (key, value) in updates {
            self.fields.insert(key, value);
        }
    }

    /// Records how a cycle ended
    pub fn record_outcome(&mut self, outcome: CycleOutcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    /// Names of fields that are still empty
    pub fn empty_fields(&self) -> Vec<String> {
        empty_fields(&self.fields)
    }
}

/// Lists empty fields of a field map
///
/// Empty strings and empty arrays are reported by key. For nested objects each
/// empty member is reported as `parent.child`.
pub fn empty_fields(fields: &FieldMap) -> Vec<String> {
    let mut empty = Vec::new();

    for (key, value) in fields {
        match value {
            Value::String(s) if s.is_empty() => empty.push(key.clone()),
            Value::Array(a) if a.is_empty() => empty.push(key.clone()),
            Value::Object(members) => {
                for (sub_key, sub_value) in members {
                    if is_empty_value(sub_value) {
                        empty.push(format!("{}.{}", key, sub_key));
                    }
                }
            }
            _ => {}
        }
    }

    empty
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Why a crawl session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlOutcome {
    /// Frontier drained and no cycle remained in flight
    Exhausted,

    /// The configured page cap was reached
    PageCapReached,

    /// The session timeout fired; outstanding cycles were abandoned
    TimedOut,
}

impl CrawlOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::PageCapReached => "page_cap_reached",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
