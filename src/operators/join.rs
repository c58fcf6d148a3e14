//! Build phase scans the right child into a multi-map keyed by the
//! stringified join key (skipping NULL keys); probe phase scans the left
//! child in order. INNER drops unmatched left rows; LEFT also emits
//! unmatched left rows with right columns elided; RIGHT also appends
//! unmatched right rows (in right-scan order) with left columns elided
//! (see the ordering guarantees in the module docs).

use indexmap::IndexMap;

use crate::sql::ast::JoinType;
use crate::types::Row;

pub struct HashJoinOp {
    inner: std::vec::IntoIter<Row>,
}

impl HashJoinOp {
    pub fn new<L, R>(left: L, right: R, join_type: JoinType, left_key: &str, right_key: &str) -> Self
    where
        L: Iterator<Item = Row>,
        R: Iterator<Item = Row>,
    {
        let right_rows: Vec<Row> = right.collect();
        let mut build: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, row) in right_rows.iter().enumerate() {
            if let Some(value) = row.get(right_key) {
                if !value.is_null() {
                    build.entry(value.to_string()).or_default().push(idx);
                }
            }
        }

        let mut matched_right = vec![false; right_rows.len()];
        let mut out: Vec<Row> = Vec::new();

        for left_row in left {
            let key = left_row.get(left_key).filter(|v| !v.is_null()).map(ToString::to_string);
            let matches: &[usize] = key.as_deref().and_then(|k| build.get(k)).map(Vec::as_slice).unwrap_or(&[]);

            if matches.is_empty() {
                if join_type == JoinType::Left {
                    out.push(left_row.clone());
                }
                continue;
            }

            for &idx in matches {
                matched_right[idx] = true;
                out.push(merge_rows(&left_row, &right_rows[idx]));
            }
        }

        if join_type == JoinType::Right {
            for (idx, row) in right_rows.iter().enumerate() {
                if !matched_right[idx] {
                    out.push(row.clone());
                }
            }
        }

        Self { inner: out.into_iter() }
    }
}

/// Concatenate both rows; a column present on both sides keeps the left
/// value and stores the right one under `right_{col}`.
fn merge_rows(left: &Row, right: &Row) -> Row {
    let mut merged = left.clone();
    for (col, value) in right {
        if merged.contains_key(col) {
            merged.insert(format!("right_{col}"), value.clone());
        } else {
            merged.insert(col.clone(), value.clone());
        }
    }
    merged
}

impl Iterator for HashJoinOp {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use indexmap::IndexMap;

    fn customer(id: i64, name: &str) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("id".to_string(), Value::Integer(id));
        r.insert("name".to_string(), Value::Str(name.to_string()));
        r
    }

    fn order(customer_id: i64, amount: i64) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("customer_id".to_string(), Value::Integer(customer_id));
        r.insert("amount".to_string(), Value::Integer(amount));
        r
    }

    #[test]
    fn left_join_elides_right_columns_for_unmatched_rows() {
        let customers = vec![customer(1, "Alice"), customer(2, "Bob"), customer(3, "Charlie")];
        let orders = vec![order(1, 100), order(2, 200)];
        let out: Vec<Row> =
            HashJoinOp::new(customers.into_iter(), orders.into_iter(), JoinType::Left, "id", "customer_id").collect();
        assert_eq!(out.len(), 3);
        let charlie = out.iter().find(|r| r.get("name") == Some(&Value::Str("Charlie".into()))).unwrap();
        assert!(!charlie.contains_key("amount"));
    }

    #[test]
    fn inner_join_drops_unmatched_rows() {
        let customers = vec![customer(1, "Alice"), customer(2, "Bob")];
        let orders = vec![order(1, 100)];
        let out: Vec<Row> =
            HashJoinOp::new(customers.into_iter(), orders.into_iter(), JoinType::Inner, "id", "customer_id").collect();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn right_join_appends_unmatched_right_rows_in_scan_order() {
        let customers = vec![customer(1, "Alice")];
        let orders = vec![order(1, 100), order(9, 900)];
        let out: Vec<Row> =
            HashJoinOp::new(customers.into_iter(), orders.into_iter(), JoinType::Right, "id", "customer_id").collect();
        assert_eq!(out.len(), 2);
        assert!(!out[1].contains_key("name"));
    }
}
