use crate::value::Value;
use std::cmp::Ordering;

/// Total canonical comparator used by condition algebra and IN-list sorting.
///
/// Ordering rules:
/// 1. Canonical variant rank
/// 2. Variant-specific comparison for same-ranked values
///
/// Integers and floats share a rank and compare numerically.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Value equality under the canonical comparator (`1 == 1.0`).
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    canonical_cmp(left, right) == Ordering::Equal
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Int(a), Value::Float(b)) => cmp_f64(int_to_f64(*a), *b),
        (Value::Float(a), Value::Int(b)) => cmp_f64(*a, int_to_f64(*b)),
        (Value::Float(a), Value::Float(b)) => cmp_f64(*a, *b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => cmp_list(a, b),
        (Value::Object(a), Value::Object(b)) => cmp_object(a, b),
        _ => Ordering::Equal,
    }
}

#[allow(clippy::cast_precision_loss)]
const fn int_to_f64(v: i64) -> f64 {
    v as f64
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

fn cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        let ord = canonical_cmp(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}

fn cmp_object(left: &[(String, Value)], right: &[(String, Value)]) -> Ordering {
    let mut left = left.iter().collect::<Vec<_>>();
    let mut right = right.iter().collect::<Vec<_>>();
    left.sort_by(|a, b| a.0.cmp(&b.0));
    right.sort_by(|a, b| a.0.cmp(&b.0));

    for ((lk, lv), (rk, rv)) in left.iter().zip(&right) {
        let ord = lk.cmp(rk).then_with(|| canonical_cmp(lv, rv));
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}
