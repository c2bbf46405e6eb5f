// View engine: filter -> sort pipeline, memoization, stats and pagination

use crate::filter::{self, FilterSpec};
use crate::record::{FieldValue, Record};
use crate::sort::{Comparator, SortSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Compute the current view: records matching `filter`, stably sorted by `sort`.
///
/// The input slice is never mutated; the result borrows from it. Passing
/// `None` for `sort` keeps insertion order.
pub fn compute_view<'a, R: Record>(records: &'a [R], filter: &FilterSpec, sort: Option<&SortSpec>) -> Vec<&'a R> {
    compute_view_at(records, filter, sort, Utc::now())
}

/// [`compute_view`] with an explicit "now" for time-relative rules
pub fn compute_view_at<'a, R: Record>(
    records: &'a [R],
    filter: &FilterSpec,
    sort: Option<&SortSpec>,
    now: DateTime<Utc>,
) -> Vec<&'a R> {
    view_indices(records, filter, sort, now)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}

fn view_indices<R: Record>(records: &[R], filter: &FilterSpec, sort: Option<&SortSpec>, now: DateTime<Utc>) -> Vec<usize> {
    let predicate = filter::compile_at(filter, now);
    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| predicate.matches(*r))
        .map(|(i, _)| i)
        .collect();

    if let Some(spec) = sort {
        let cmp = Comparator::new(spec);
        // sort_by is stable, ties keep input order
        indices.sort_by(|&a, &b| cmp.compare(&records[a], &records[b]));
    }

    debug!(
        total = records.len(),
        matched = indices.len(),
        sort = ?sort.map(|s| s.to_string()),
        "Computed view"
    );
    indices
}

/// Memoizes the view on (store generation, filter, sort)
///
/// Filters with time-relative rules are recomputed on every call.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(u64, FilterSpec, Option<SortSpec>)>,
    indices: Vec<usize>,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices into `records` forming the current view
    pub fn indices<R: Record>(
        &mut self,
        generation: u64,
        records: &[R],
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
    ) -> &[usize] {
        let cacheable = !filter.is_time_relative();
        let fresh = cacheable
            && self
                .key
                .as_ref()
                .is_some_and(|(g, f, s)| *g == generation && f == filter && s.as_ref() == sort);

        if fresh {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.indices = view_indices(records, filter, sort, Utc::now());
            self.key = cacheable.then(|| (generation, filter.clone(), sort.cloned()));
        }
        &self.indices
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// (hits, misses)
    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

// ============================================================================
// Stats
// ============================================================================

/// One aggregate metric over the full record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metric {
    /// Number of records
    Count,
    /// Number of records whose `field` renders as `equals`
    CountWhere { field: String, equals: String },
    /// Sum of numeric `field`
    Sum { field: String },
    /// Sum of numeric `field` over records whose `where_field` renders as `equals`
    SumWhere {
        field: String,
        where_field: String,
        equals: String,
    },
    /// Mean of numeric `field` over records that have one
    Average { field: String },
    /// Percentage (0-100) of records whose `field` renders as `equals`
    Rate { field: String, equals: String },
}

impl Metric {
    pub fn count_where(field: impl Into<String>, equals: impl Into<String>) -> Self {
        Metric::CountWhere {
            field: field.into(),
            equals: equals.into(),
        }
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Metric::Sum { field: field.into() }
    }

    pub fn sum_where(field: impl Into<String>, where_field: impl Into<String>, equals: impl Into<String>) -> Self {
        Metric::SumWhere {
            field: field.into(),
            where_field: where_field.into(),
            equals: equals.into(),
        }
    }

    pub fn average(field: impl Into<String>) -> Self {
        Metric::Average { field: field.into() }
    }

    pub fn rate(field: impl Into<String>, equals: impl Into<String>) -> Self {
        Metric::Rate {
            field: field.into(),
            equals: equals.into(),
        }
    }

    fn evaluate<R: Record>(&self, records: &[R]) -> f64 {
        let value = match self {
            Metric::Count => records.len() as f64,
            Metric::CountWhere { field, equals } => records.iter().filter(|r| field_equals(*r, field, equals)).count() as f64,
            Metric::Sum { field } => records.iter().filter_map(|r| finite_number(r, field)).sum(),
            Metric::SumWhere {
                field,
                where_field,
                equals,
            } => records
                .iter()
                .filter(|r| field_equals(*r, where_field, equals))
                .filter_map(|r| finite_number(r, field))
                .sum(),
            Metric::Average { field } => {
                let values: Vec<f64> = records.iter().filter_map(|r| finite_number(r, field)).collect();
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Metric::Rate { field, equals } => {
                if records.is_empty() {
                    0.0
                } else {
                    let hits = records.iter().filter(|r| field_equals(*r, field, equals)).count();
                    hits as f64 * 100.0 / records.len() as f64
                }
            }
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

fn field_equals<R: Record>(record: &R, field: &str, equals: &str) -> bool {
    record.field(field).is_some_and(|v| v.to_string() == equals)
}

fn finite_number<R: Record>(record: &R, field: &str) -> Option<f64> {
    record
        .field(field)
        .as_ref()
        .and_then(FieldValue::as_f64)
        .filter(|v| v.is_finite())
}

/// Named metrics to compute for a dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsSpec {
    metrics: BTreeMap<String, Metric>,
}

impl StatsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, metric: Metric) -> Self {
        self.metrics.insert(name.into(), metric);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Metric)> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Metric name -> value. Always contains `count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats {
    values: BTreeMap<String, f64>,
}

impl Stats {
    /// Value of a metric; unknown metrics read as 0
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub const COUNT_METRIC: &str = "count";

/// Compute stats over the full record set (never the filtered view)
pub fn compute_stats<R: Record>(records: &[R], spec: &StatsSpec) -> Stats {
    let mut values = BTreeMap::new();
    values.insert(COUNT_METRIC.to_string(), records.len() as f64);
    for (name, metric) in spec.iter() {
        values.insert(name.clone(), metric.evaluate(records));
    }
    debug!(records = records.len(), metrics = values.len(), "Computed stats");
    Stats { values }
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of a view
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Current page number (starts at 1)
    pub page: usize,
    pub per_page: usize,
    /// Total items in the view
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Slice a view into a page. `page` is clamped to at least 1, `per_page` likewise.
pub fn paginate<T: Clone>(view: &[T], page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = view.len();
    let total_pages = total.div_ceil(per_page);
    let offset = (page - 1).saturating_mul(per_page);
    let items = view.iter().skip(offset).take(per_page).cloned().collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }
}
