//! Predicate evaluation and value ordering for the in-memory engine.

use std::cmp::Ordering;

use gridquery_proto::Value;

use crate::query::Predicate;

/// Evaluate a predicate against one joined tuple.
///
/// `lookup` maps a qualified field name to its value; `None` means the alias
/// had no row (an unmatched left join) and behaves like null.
pub fn evaluate<'v, F>(predicate: &Predicate, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<&'v Value>,
{
    match predicate {
        Predicate::Contains { field, value } => match lookup(field).and_then(Value::search_text) {
            Some(text) => text.to_lowercase().contains(&value.to_lowercase()),
            None => false,
        },
        Predicate::Eq { field, value } => compare_field(lookup(field), value, values_equal),
        Predicate::Ne { field, value } => compare_field(lookup(field), value, |a, b| !values_equal(a, b)),
        Predicate::Lt { field, value } => {
            compare_field(lookup(field), value, |a, b| compare_values(a, b).is_some_and(Ordering::is_lt))
        }
        Predicate::Le { field, value } => {
            compare_field(lookup(field), value, |a, b| compare_values(a, b).is_some_and(Ordering::is_le))
        }
        Predicate::Gt { field, value } => {
            compare_field(lookup(field), value, |a, b| compare_values(a, b).is_some_and(Ordering::is_gt))
        }
        Predicate::Ge { field, value } => {
            compare_field(lookup(field), value, |a, b| compare_values(a, b).is_some_and(Ordering::is_ge))
        }
        Predicate::In { field, values } => match lookup(field) {
            Some(fv) if !fv.is_null() => values.iter().any(|v| values_equal(fv, v)),
            _ => false,
        },
        Predicate::IsNull { field } => matches!(lookup(field), None | Some(Value::Null)),
        Predicate::IsNotNull { field } => !matches!(lookup(field), None | Some(Value::Null)),
        Predicate::And(children) => children.iter().all(|c| evaluate(c, lookup)),
        Predicate::Or(children) => children.iter().any(|c| evaluate(c, lookup)),
    }
}

/// Null never matches a comparison.
fn compare_field<F>(field_value: Option<&Value>, value: &Value, comparator: F) -> bool
where
    F: FnOnce(&Value, &Value) -> bool,
{
    match field_value {
        Some(fv) if !fv.is_null() && !value.is_null() => comparator(fv, value),
        _ => false,
    }
}

/// Check if two values are equal, widening integers.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int32(a), Value::Int32(b)) => a == b,
        (Value::Int64(a), Value::Int64(b)) => a == b,
        (Value::Int32(a), Value::Int64(b)) => (*a as i64) == *b,
        (Value::Int64(a), Value::Int32(b)) => *a == (*b as i64),
        (Value::Float64(a), Value::Float64(b)) => a == b,
        (Value::Float64(_), _) | (_, Value::Float64(_)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
        (Value::Uuid(a), Value::Uuid(b)) => a == b,
        _ => false,
    }
}

/// Compare two values, returning their ordering if comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int64(b)) => Some((*a as i64).cmp(b)),
        (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&(*b as i64))),
        (Value::Float64(_), _) | (_, Value::Float64(_)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order for sorting. Nulls and missing values sort first.
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(av), Some(bv)) => compare_values(av, bv).unwrap_or_else(|| {
            // mixed types: fall back to their text
            av.search_text().cmp(&bv.search_text())
        }),
    }
}
