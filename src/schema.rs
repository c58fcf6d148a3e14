//! Ordered column-name → `LogicalType` mapping, with sampling-based inference
//! and column-wise merge.

use crate::types::{infer_common_type, LogicalType, Row, Value};
use indexmap::IndexMap;

/// Ordered mapping from column name to its inferred logical type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: IndexMap<String, LogicalType>,
}

impl Schema {
    pub fn new() -> Self {
        Self { columns: IndexMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: LogicalType) {
        self.columns.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<LogicalType> {
        self.columns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LogicalType)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Infer a schema from a bounded sample of rows: `column → Value` maps.
    /// Columns are discovered in first-seen order across the sample.
    pub fn from_rows<'a, I>(rows: I) -> Schema
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut samples: IndexMap<String, Vec<&Value>> = IndexMap::new();
        for row in rows {
            for (col, val) in row {
                samples.entry(col.clone()).or_insert_with(|| {
                    order.push(col.clone());
                    Vec::new()
                }).push(val);
            }
        }
        let mut schema = Schema::new();
        for col in order {
            let values = samples.get(&col).cloned().unwrap_or_default();
            schema.insert(col, infer_common_type(values.into_iter()));
        }
        schema
    }

    /// Column-wise union widen: columns present in only one side pass through
    /// unchanged; columns present in both are coerced via `LogicalType::coerce_to`.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut merged = Schema::new();
        for (name, ty) in self.iter() {
            merged.insert(name, ty);
        }
        for (name, ty) in other.iter() {
            match merged.get(name) {
                Some(existing) => merged.insert(name, existing.coerce_to(ty)),
                None => merged.insert(name, ty),
            }
        }
        merged
    }
}

/// Optional per-column statistics, used by the cost-based framework stubs.
#[derive(Debug, Clone, Default)]
pub struct ColumnStatistics {
    pub distinct_count: Option<u64>,
    pub null_count: Option<u64>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub avg_string_length: Option<f64>,
}

/// Optional per-table statistics, used by the cost-based framework stubs.
#[derive(Debug, Clone, Default)]
pub struct TableStatistics {
    pub row_count: Option<u64>,
    pub columns: IndexMap<String, ColumnStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn from_rows_infers_and_widens() {
        let rows = vec![
            row(&[("age", Value::Integer(1))]),
            row(&[("age", Value::Float(2.5))]),
        ];
        let schema = Schema::from_rows(&rows);
        assert_eq!(schema.get("age"), Some(LogicalType::Float));
    }

    #[test]
    fn merge_is_column_wise_union() {
        let mut a = Schema::new();
        a.insert("x", LogicalType::Integer);
        let mut b = Schema::new();
        b.insert("y", LogicalType::String);
        let merged = a.merge(&b);
        assert_eq!(merged.get("x"), Some(LogicalType::Integer));
        assert_eq!(merged.get("y"), Some(LogicalType::String));
    }

    #[test]
    fn merge_with_self_is_identity() {
        let mut a = Schema::new();
        a.insert("x", LogicalType::Integer);
        a.insert("y", LogicalType::String);
        assert_eq!(a.merge(&a), a);
    }
}
