// Sort specs and the comparator builder

use crate::record::{FieldValue, Record, parse_date};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Field to sort by plus direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default, alias = "dir")]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `field` or `field:asc` / `field:desc`
    pub fn parse(s: &str) -> Option<Self> {
        let (field, dir) = match s.split_once(':') {
            Some((f, d)) => (f.trim(), d.trim()),
            None => (s.trim(), "asc"),
        };
        if field.is_empty() {
            return None;
        }
        let direction = match dir.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return None,
        };
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl std::fmt::Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// Comparator built from a [`SortSpec`]
///
/// Undefined values always sort last, in either direction. Use with a stable
/// sort so that ties keep their input order.
#[derive(Debug, Clone)]
pub struct Comparator {
    field: String,
    direction: SortDirection,
}

impl Comparator {
    pub fn new(spec: &SortSpec) -> Self {
        Self {
            field: spec.field.clone(),
            direction: spec.direction,
        }
    }

    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        match (a.field(&self.field), b.field(&self.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = compare_values(&x, &y);
                match self.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        }
    }
}

fn kind_rank(v: &FieldValue) -> u8 {
    match v {
        FieldValue::Bool(_) => 0,
        FieldValue::Int(_) | FieldValue::Float(_) => 1,
        FieldValue::Date(_) => 2,
        FieldValue::String(_) => 3,
    }
}

/// Total order over defined field values
///
/// Two strings that both parse as dates compare as instants.
pub fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::String(x), FieldValue::String(y)) => match (parse_date(x), parse_date(y)) {
            (Some(dx), Some(dy)) => dx.cmp(&dy).then_with(|| x.cmp(y)),
            _ => x.cmp(y),
        },
        (FieldValue::Int(x), FieldValue::Int(y)) => x.cmp(y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
        (FieldValue::Int(_) | FieldValue::Float(_), FieldValue::Int(_) | FieldValue::Float(_)) => {
            let x = a.as_f64().unwrap_or_default();
            let y = b.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JsonRecord;
    use serde_json::{Value, json};

    fn rec(value: Value) -> JsonRecord {
        JsonRecord::from_value(value).unwrap()
    }

    fn sorted_ids(records: &[JsonRecord], spec: &SortSpec) -> Vec<String> {
        let cmp = Comparator::new(spec);
        let mut refs: Vec<&JsonRecord> = records.iter().collect();
        refs.sort_by(|a, b| cmp.compare(*a, *b));
        refs.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_sort_spec_parse() {
        assert_eq!(SortSpec::parse("joinDate"), Some(SortSpec::asc("joinDate")));
        assert_eq!(SortSpec::parse("amount:desc"), Some(SortSpec::desc("amount")));
        assert_eq!(SortSpec::parse("amount:DESC"), Some(SortSpec::desc("amount")));
        assert_eq!(SortSpec::parse("amount:sideways"), None);
        assert_eq!(SortSpec::parse(":asc"), None);
        assert_eq!(SortSpec::desc("amount").to_string(), "amount:desc");
    }

    #[test]
    fn test_sort_spec_serde_accepts_dir_alias() {
        let spec: SortSpec = serde_json::from_value(json!({"field": "joinDate", "dir": "desc"})).unwrap();
        assert_eq!(spec, SortSpec::desc("joinDate"));
        let spec: SortSpec = serde_json::from_value(json!({"field": "joinDate"})).unwrap();
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_numeric_sort_mixes_int_and_float() {
        let records = vec![
            rec(json!({"id": "a", "amount": 10})),
            rec(json!({"id": "b", "amount": 2.5})),
            rec(json!({"id": "c", "amount": 7})),
        ];
        assert_eq!(sorted_ids(&records, &SortSpec::asc("amount")), vec!["b", "c", "a"]);
        assert_eq!(sorted_ids(&records, &SortSpec::desc("amount")), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_strings_are_case_sensitive() {
        let records = vec![
            rec(json!({"id": "1", "name": "bob"})),
            rec(json!({"id": "2", "name": "Zed"})),
            rec(json!({"id": "3", "name": "alice"})),
        ];
        // Uppercase sorts before lowercase in byte order
        assert_eq!(sorted_ids(&records, &SortSpec::asc("name")), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_date_strings_sort_chronologically() {
        let records = vec![
            // 04:00Z on the 6th
            rec(json!({"id": "a", "paidAt": "2024-01-05T23:00:00-05:00"})),
            rec(json!({"id": "b", "paidAt": "2024-01-06T01:00:00Z"})),
            rec(json!({"id": "c", "paidAt": "2024-01-06"})),
        ];
        assert_eq!(sorted_ids(&records, &SortSpec::asc("paidAt")), vec!["c", "b", "a"]);
        assert_eq!(sorted_ids(&records, &SortSpec::desc("paidAt")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_undefined_sorts_last_in_both_directions() {
        let records = vec![
            rec(json!({"id": "none1"})),
            rec(json!({"id": "low", "score": 1})),
            rec(json!({"id": "none2", "score": null})),
            rec(json!({"id": "high", "score": 9})),
        ];
        assert_eq!(
            sorted_ids(&records, &SortSpec::asc("score")),
            vec!["low", "high", "none1", "none2"]
        );
        assert_eq!(
            sorted_ids(&records, &SortSpec::desc("score")),
            vec!["high", "low", "none1", "none2"]
        );
    }

    #[test]
    fn test_ties_keep_input_order_in_both_directions() {
        let records = vec![
            rec(json!({"id": "a", "tier": "gold"})),
            rec(json!({"id": "b", "tier": "silver"})),
            rec(json!({"id": "c", "tier": "gold"})),
            rec(json!({"id": "d", "tier": "silver"})),
        ];
        assert_eq!(sorted_ids(&records, &SortSpec::asc("tier")), vec!["a", "c", "b", "d"]);
        assert_eq!(sorted_ids(&records, &SortSpec::desc("tier")), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_mixed_kinds_use_rank() {
        assert_eq!(
            compare_values(&FieldValue::Bool(true), &FieldValue::Int(0)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&FieldValue::from("1"), &FieldValue::Int(2)),
            Ordering::Greater
        );
    }
}
