//! Materializes the full input and sorts it by a composite key: NULLs sort
//! last regardless of direction, and DESC is implemented by reversing the
//! per-column comparison result — equivalent to negating numeric keys or
//! wrapping non-numeric comparisons, but expressed uniformly.

use std::cmp::Ordering;

use crate::sql::ast::{OrderItem, SortDirection};
use crate::types::{Row, Value};

pub struct OrderByOp {
    inner: std::vec::IntoIter<Row>,
}

impl OrderByOp {
    pub fn new<I: Iterator<Item = Row>>(inner: I, items: Vec<OrderItem>) -> Self {
        let mut rows: Vec<Row> = inner.collect();
        rows.sort_by(|a, b| {
            for item in &items {
                let ordering = compare_ordered(a.get(&item.column), b.get(&item.column), item.direction);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Self { inner: rows.into_iter() }
    }
}

fn compare_ordered(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a_null = a.map(Value::is_null).unwrap_or(true);
    let b_null = b.map(Value::is_null).unwrap_or(true);
    match (a_null, b_null) {
        (true, true) => return Ordering::Equal,
        // NULLs sort last regardless of ASC/DESC.
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ordering = a.unwrap().compare(b.unwrap()).unwrap_or(Ordering::Equal);
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

impl Iterator for OrderByOp {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn row(total: Option<i64>) -> Row {
        let mut r: Row = IndexMap::new();
        r.insert("total".to_string(), total.map(Value::Integer).unwrap_or(Value::Null));
        r
    }

    #[test]
    fn sorts_descending_with_nulls_last() {
        let rows = vec![row(Some(100)), row(None), row(Some(400))];
        let items = vec![OrderItem { column: "total".into(), direction: SortDirection::Desc }];
        let out: Vec<Row> = OrderByOp::new(rows.into_iter(), items).collect();
        assert!(matches!(out[0].get("total"), Some(Value::Integer(400))));
        assert!(matches!(out[1].get("total"), Some(Value::Integer(100))));
        assert!(matches!(out[2].get("total"), Some(Value::Null)));
    }

    #[test]
    fn nulls_last_in_ascending_order_too() {
        let rows = vec![row(None), row(Some(1))];
        let items = vec![OrderItem { column: "total".into(), direction: SortDirection::Asc }];
        let out: Vec<Row> = OrderByOp::new(rows.into_iter(), items).collect();
        assert!(matches!(out[0].get("total"), Some(Value::Integer(1))));
        assert!(matches!(out[1].get("total"), Some(Value::Null)));
    }
}
