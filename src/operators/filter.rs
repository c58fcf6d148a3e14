//! Re-applies WHERE on top of whatever the reader already pruned via
//! pushdown — pushdown is always advisory, so this operator is what
//! actually guarantees correctness.

use crate::eval::conditions_match;
use crate::sql::ast::Condition;
use crate::types::Row;

pub struct FilterOp<I> {
    inner: I,
    conditions: Vec<Condition>,
}

impl<I: Iterator<Item = Row>> FilterOp<I> {
    pub fn new(inner: I, conditions: Vec<Condition>) -> Self {
        Self { inner, conditions }
    }
}

impl<I: Iterator<Item = Row>> Iterator for FilterOp<I> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        for row in self.inner.by_ref() {
            if conditions_match(&row, &self.conditions) {
                return Some(row);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::CompareOp;
    use crate::types::Value;
    use indexmap::IndexMap;

    fn row(age: i64) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("age".to_string(), Value::Integer(age));
        r
    }

    #[test]
    fn keeps_only_matching_rows() {
        let rows = vec![row(30), row(20), row(40)];
        let cond = Condition { column: "age".into(), op: CompareOp::Gt, value: Value::Integer(25) };
        let out: Vec<Row> = FilterOp::new(rows.into_iter(), vec![cond]).collect();
        assert_eq!(out.len(), 2);
    }
}
