//! Yields at most `n` rows, then stops pulling the child entirely — so
//! `LIMIT 0` never reads a row.

use crate::types::Row;

pub struct LimitOp<I> {
    inner: I,
    remaining: u64,
}

impl<I: Iterator<Item = Row>> LimitOp<I> {
    pub fn new(inner: I, n: u64) -> Self {
        Self { inner, remaining: n }
    }
}

impl<I: Iterator<Item = Row>> Iterator for LimitOp<I> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use indexmap::IndexMap;

    fn row(n: i64) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("n".to_string(), Value::Integer(n));
        r
    }

    #[test]
    fn limit_zero_yields_nothing() {
        let rows = vec![row(1), row(2)];
        let out: Vec<Row> = LimitOp::new(rows.into_iter(), 0).collect();
        assert!(out.is_empty());
    }

    #[test]
    fn limit_larger_than_source_returns_all() {
        let rows = vec![row(1), row(2)];
        let out: Vec<Row> = LimitOp::new(rows.into_iter(), 100).collect();
        assert_eq!(out.len(), 2);
    }
}
