//! Materializes groups into a hash table keyed by a stringified tuple of
//! group-column values (values
//! that aren't natively hashable degrade to their string form), then emits
//! one row per group in first-seen order.

use indexmap::IndexMap;

use super::aggregate::Accumulator;
use crate::sql::ast::Aggregate;
use crate::types::{Row, Value};

pub struct HashGroupByOp {
    inner: std::vec::IntoIter<Row>,
}

impl HashGroupByOp {
    pub fn new<I: Iterator<Item = Row>>(inner: I, group_cols: Vec<String>, aggregates: Vec<Aggregate>) -> Self {
        let mut groups: IndexMap<Vec<String>, (Row, Vec<Accumulator>)> = IndexMap::new();

        // An aggregate with no GROUP BY is one implicit group over the whole
        // input, which must still emit a row (COUNT=0, SUM/AVG/MIN/MAX=NULL)
        // when the input is empty — so seed it up front
        // rather than lazily on first row.
        if group_cols.is_empty() {
            groups.insert(Vec::new(), (Row::new(), new_accumulators(&aggregates)));
        }

        for row in inner {
            let key: Vec<String> = group_cols.iter().map(|c| group_key_part(&row, c)).collect();
            let entry = groups.entry(key).or_insert_with(|| {
                let mut group_row = Row::new();
                for c in &group_cols {
                    group_row.insert(c.clone(), row.get(c).cloned().unwrap_or(Value::Null));
                }
                (group_row, new_accumulators(&aggregates))
            });
            for acc in entry.1.iter_mut() {
                acc.update(&row);
            }
        }

        let rows: Vec<Row> = groups
            .into_values()
            .map(|(mut group_row, accumulators)| {
                for (spec, acc) in aggregates.iter().zip(accumulators.iter()) {
                    group_row.insert(spec.effective_alias(), acc.finalize());
                }
                group_row
            })
            .collect();

        Self { inner: rows.into_iter() }
    }
}

fn new_accumulators(aggregates: &[Aggregate]) -> Vec<Accumulator> {
    aggregates.iter().cloned().map(Accumulator::new).collect()
}

fn group_key_part(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(v) if !v.is_null() => v.to_string(),
        _ => String::new(),
    }
}

impl Iterator for HashGroupByOp {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::AggregateFunction;
    use indexmap::IndexMap;

    fn row(region: &str, amount: i64) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("region".to_string(), Value::Str(region.to_string()));
        r.insert("amount".to_string(), Value::Integer(amount));
        r
    }

    #[test]
    fn groups_and_sums_by_region() {
        let rows = vec![row("E", 100), row("E", 200), row("W", 150), row("W", 250), row("E", 50)];
        let aggregates = vec![Aggregate { function: AggregateFunction::Sum, column: Some("amount".into()), alias: Some("total".into()) }];
        let out: Vec<Row> = HashGroupByOp::new(rows.into_iter(), vec!["region".into()], aggregates).collect();
        assert_eq!(out.len(), 2);
        let e = out.iter().find(|r| r.get("region") == Some(&Value::Str("E".into()))).unwrap();
        assert!(matches!(e.get("total"), Some(Value::Integer(350))));
    }

    #[test]
    fn implicit_group_over_empty_input_yields_one_row() {
        let rows: Vec<Row> = Vec::new();
        let aggregates = vec![Aggregate { function: AggregateFunction::Count, column: None, alias: None }];
        let out: Vec<Row> = HashGroupByOp::new(rows.into_iter(), Vec::new(), aggregates).collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].get("count_star"), Some(Value::Integer(0))));
    }
}
