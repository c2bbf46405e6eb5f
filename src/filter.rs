// Filter specs and the predicate compiler

use crate::record::{FieldValue, Record};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Sentinel enum value meaning "no constraint"
pub const ALL: &str = "all";

const MS_PER_DAY: i64 = 86_400_000;

/// A single filter rule, keyed by field name inside a [`FilterSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterRule {
    /// `record[key]` rendered as text equals `value`; `"all"` or empty disables it
    Exact { value: String },
    /// Case-insensitive substring search across `fields` (the key is a label)
    Text { query: String, fields: Vec<String> },
    /// Inclusive numeric range on `record[key]`; bounds stay raw until compiled
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Value>,
    },
    /// Date in `record[key]` falls between now and now + `days`
    Within { days: Value },
}

impl FilterRule {
    pub fn exact(value: impl Into<String>) -> Self {
        FilterRule::Exact { value: value.into() }
    }

    pub fn text<I, S>(query: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterRule::Text {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FilterRule::Range {
            min: min.map(Value::from),
            max: max.map(Value::from),
        }
    }

    pub fn within_days(days: u32) -> Self {
        FilterRule::Within { days: Value::from(days) }
    }

    /// Whether evaluating this rule depends on the current time
    pub fn is_time_relative(&self) -> bool {
        matches!(self, FilterRule::Within { .. })
    }
}

/// Declarative filter over a record collection: field key -> rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    rules: BTreeMap<String, FilterRule>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, rule: FilterRule) -> Self {
        self.set(key, rule);
        self
    }

    /// Insert or replace the rule for `key`
    pub fn set(&mut self, key: impl Into<String>, rule: FilterRule) {
        self.rules.insert(key.into(), rule);
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterRule> {
        self.rules.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FilterRule> {
        self.rules.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterRule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_time_relative(&self) -> bool {
        self.rules.values().any(FilterRule::is_time_relative)
    }

    /// Lenient parse of a persisted filter object.
    ///
    /// Entries that do not deserialize into a rule are dropped with a warning.
    pub fn from_json_lenient(value: &Value) -> Self {
        let mut spec = FilterSpec::new();
        let Some(obj) = value.as_object() else {
            warn!(?value, "Filter state is not an object, ignoring");
            return spec;
        };
        for (key, raw) in obj {
            match serde_json::from_value::<FilterRule>(raw.clone()) {
                Ok(rule) => spec.set(key.clone(), rule),
                Err(e) => warn!(key = %key, error = %e, "Dropping malformed filter rule"),
            }
        }
        spec
    }
}

/// A compiled clause; bounds parsed and text lower-cased once
#[derive(Debug, Clone)]
enum Clause {
    Exact { field: String, value: String, date: Option<DateMatch> },
    Text { needle: String, fields: Vec<String> },
    Range { field: String, min: Option<f64>, max: Option<f64> },
    Within { field: String, days: i64, now: DateTime<Utc> },
}

impl Clause {
    fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Clause::Exact { field, value, date } => record.field(field).is_some_and(|v| {
                v.to_string() == *value || date.is_some_and(|d| v.as_date().is_some_and(|t| d.matches(t)))
            }),
            Clause::Text { needle, fields } => fields.iter().any(|f| {
                record
                    .field(f)
                    .is_some_and(|v| v.to_string().to_lowercase().contains(needle.as_str()))
            }),
            Clause::Range { field, min, max } => {
                let Some(v) = record.field(field).as_ref().and_then(FieldValue::as_f64) else {
                    return false;
                };
                min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi)
            }
            Clause::Within { field, days, now } => {
                let Some(target) = record.field(field).as_ref().and_then(FieldValue::as_date) else {
                    return false;
                };
                let offset = (target - *now).num_milliseconds().div_euclid(MS_PER_DAY);
                (0..=*days).contains(&offset)
            }
        }
    }
}

/// Exact-rule value that reads as a date: a bare day or a full timestamp
#[derive(Debug, Clone, Copy)]
enum DateMatch {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl DateMatch {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Some(DateMatch::Day(day));
        }
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| DateMatch::Instant(dt.with_timezone(&Utc)))
    }

    /// Days compare on the UTC calendar date
    fn matches(self, target: DateTime<Utc>) -> bool {
        match self {
            DateMatch::Day(day) => target.date_naive() == day,
            DateMatch::Instant(at) => target == at,
        }
    }
}

/// A filter compiled into a single AND-combined predicate
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }

    /// Number of active clauses after dropping disabled and malformed rules
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Compile a filter spec, evaluating time-relative rules against the current time
pub fn compile(spec: &FilterSpec) -> Predicate {
    compile_at(spec, Utc::now())
}

/// Compile a filter spec with an explicit "now"
pub fn compile_at(spec: &FilterSpec, now: DateTime<Utc>) -> Predicate {
    let clauses: Vec<Clause> = spec
        .iter()
        .filter_map(|(key, rule)| compile_rule(key, rule, now))
        .collect();
    debug!(rules = spec.len(), clauses = clauses.len(), "Compiled filter spec");
    Predicate { clauses }
}

fn compile_rule(key: &str, rule: &FilterRule, now: DateTime<Utc>) -> Option<Clause> {
    match rule {
        FilterRule::Exact { value } => {
            if value.is_empty() || value == ALL {
                return None;
            }
            Some(Clause::Exact {
                field: key.to_string(),
                value: value.clone(),
                date: DateMatch::parse(value),
            })
        }
        FilterRule::Text { query, fields } => {
            let needle = query.trim().to_lowercase();
            if needle.is_empty() {
                return None;
            }
            if fields.is_empty() {
                warn!(key, "Text filter has no target fields, dropping rule");
                return None;
            }
            Some(Clause::Text {
                needle,
                fields: fields.clone(),
            })
        }
        FilterRule::Range { min, max } => {
            let min = parse_bound(key, "min", min.as_ref());
            let max = parse_bound(key, "max", max.as_ref());
            if min.is_none() && max.is_none() {
                return None;
            }
            Some(Clause::Range {
                field: key.to_string(),
                min,
                max,
            })
        }
        FilterRule::Within { days } => {
            let parsed = match days {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match parsed {
                Some(d) if d >= 0 => Some(Clause::Within {
                    field: key.to_string(),
                    days: d,
                    now,
                }),
                _ => {
                    warn!(key, ?days, "Malformed day count in date filter, dropping rule");
                    None
                }
            }
        }
    }
}

fn parse_bound(key: &str, which: &str, raw: Option<&Value>) -> Option<f64> {
    let raw = raw?;
    let parsed = match raw {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            warn!(key, bound = which, value = ?raw, "Malformed range bound, ignoring");
            None
        }
    }
}
