//! Shared condition evaluation, used both by `operators::Filter` (which must
//! always re-apply WHERE regardless of pushdown) and by readers that choose
//! to apply a pushed-down filter inline as an optimization.

use std::cmp::Ordering;

use crate::sql::ast::{CompareOp, Condition};
use crate::types::{Row, Value};

/// Evaluate one simple condition against a row. A NULL value or an
/// incompatible comparison evaluates to `false`; an unrecognized operator
/// defaults to `true` (permissive), matching the operator-tree contract.
pub fn condition_matches(row: &Row, condition: &Condition) -> bool {
    let Some(actual) = row.get(&condition.column) else {
        return false;
    };
    compare_matches(actual, condition.op, &condition.value)
}

pub fn compare_matches(actual: &Value, op: CompareOp, literal: &Value) -> bool {
    if actual.is_null() || literal.is_null() {
        return false;
    }
    let ordering = actual.compare(literal);
    match (op, ordering) {
        (CompareOp::Eq, Some(Ordering::Equal)) => true,
        (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
        (CompareOp::Gt, Some(Ordering::Greater)) => true,
        (CompareOp::Lt, Some(Ordering::Less)) => true,
        (CompareOp::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
        (CompareOp::Le, Some(Ordering::Less | Ordering::Equal)) => true,
        (_, None) => false,
        _ => false,
    }
}

pub fn conditions_match(row: &Row, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| condition_matches(row, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn null_column_never_matches() {
        let mut row: Row = IndexMap::new();
        row.insert("age".to_string(), Value::Null);
        let cond = Condition { column: "age".into(), op: CompareOp::Gt, value: Value::Integer(10) };
        assert!(!condition_matches(&row, &cond));
    }

    #[test]
    fn numeric_comparison_across_int_and_float() {
        let mut row: Row = IndexMap::new();
        row.insert("age".to_string(), Value::Integer(30));
        let cond = Condition { column: "age".into(), op: CompareOp::Gt, value: Value::Float(25.0) };
        assert!(condition_matches(&row, &cond));
    }
}
