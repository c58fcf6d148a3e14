//! Rebuilds each row to contain exactly the listed columns (missing → NULL);
//! `*` passes the row through unchanged.

use crate::sql::ast::SelectColumns;
use crate::types::{Row, Value};

pub struct ProjectOp<I> {
    inner: I,
    columns: SelectColumns,
}

impl<I: Iterator<Item = Row>> ProjectOp<I> {
    pub fn new(inner: I, columns: SelectColumns) -> Self {
        Self { inner, columns }
    }
}

impl<I: Iterator<Item = Row>> Iterator for ProjectOp<I> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let row = self.inner.next()?;
        Some(match &self.columns {
            SelectColumns::Star => row,
            SelectColumns::List(cols) => {
                let mut out = Row::new();
                for c in cols {
                    out.insert(c.clone(), row.get(c).cloned().unwrap_or(Value::Null));
                }
                out
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<IndexMap<_, _>>()
    }

    #[test]
    fn projects_listed_columns_with_null_for_missing() {
        let rows = vec![row(&[("name", Value::Str("Alice".into())), ("age", Value::Integer(30))])];
        let out: Vec<Row> =
            ProjectOp::new(rows.into_iter(), SelectColumns::List(vec!["name".into(), "city".into()])).collect();
        assert_eq!(out[0].get("name"), Some(&Value::Str("Alice".into())));
        assert!(matches!(out[0].get("city"), Some(Value::Null)));
    }

    #[test]
    fn star_passes_through_unchanged() {
        let rows = vec![row(&[("a", Value::Integer(1))])];
        let out: Vec<Row> = ProjectOp::new(rows.into_iter(), SelectColumns::Star).collect();
        assert_eq!(out[0].get("a"), Some(&Value::Integer(1)));
    }
}
