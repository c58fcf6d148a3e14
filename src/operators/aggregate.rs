//! Incremental per-group aggregators driving `HashGroupBy`. Each
//! aggregator sees one row at a time via `update` and produces its result
//! via `finalize` once the group is fully materialized.

use std::cmp::Ordering;

use crate::sql::ast::{Aggregate, AggregateFunction};
use crate::types::{Row, Value};

/// Numeric running total that stays integral until a non-integer value
/// forces a promotion to `f64` — mirrors the type lattice's INTEGER ≺ FLOAT
/// widening rather than flattening every SUM/AVG to floating point.
#[derive(Debug, Clone, Copy)]
enum NumericAccumulator {
    Empty,
    Int(i64),
    Float(f64),
}

impl NumericAccumulator {
    fn add(&mut self, value: &Value) -> bool {
        let as_int = match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        };
        let as_float = value.as_f64();
        match (as_int, as_float) {
            (Some(i), _) => {
                *self = match *self {
                    NumericAccumulator::Empty => NumericAccumulator::Int(i),
                    NumericAccumulator::Int(acc) => NumericAccumulator::Int(acc + i),
                    NumericAccumulator::Float(acc) => NumericAccumulator::Float(acc + i as f64),
                };
                true
            }
            (None, Some(f)) => {
                *self = match *self {
                    NumericAccumulator::Empty => NumericAccumulator::Float(f),
                    NumericAccumulator::Int(acc) => NumericAccumulator::Float(acc as f64 + f),
                    NumericAccumulator::Float(acc) => NumericAccumulator::Float(acc + f),
                };
                true
            }
            (None, None) => false,
        }
    }

    fn into_value(self) -> Value {
        match self {
            NumericAccumulator::Empty => Value::Null,
            NumericAccumulator::Int(i) => Value::Integer(i),
            NumericAccumulator::Float(f) => Value::Float(f),
        }
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            NumericAccumulator::Empty => None,
            NumericAccumulator::Int(i) => Some(i as f64),
            NumericAccumulator::Float(f) => Some(f),
        }
    }
}

/// One aggregator instance, bound to a single `Aggregate` spec for the
/// lifetime of one group.
#[derive(Clone)]
pub struct Accumulator {
    spec: Aggregate,
    count_all: u64,
    count_non_null: u64,
    sum: NumericAccumulator,
    min: Option<Value>,
    max: Option<Value>,
}

impl Accumulator {
    pub fn new(spec: Aggregate) -> Self {
        Self {
            spec,
            count_all: 0,
            count_non_null: 0,
            sum: NumericAccumulator::Empty,
            min: None,
            max: None,
        }
    }

    /// Feed one row of the group through this aggregator. Non-numeric values
    /// seen by SUM/AVG are silently skipped; NULLs are skipped by every
    /// aggregator except `COUNT(*)`.
    pub fn update(&mut self, row: &Row) {
        match self.spec.function {
            AggregateFunction::Count => {
                self.count_all += 1;
                if let Some(col) = &self.spec.column {
                    if row.get(col).is_some_and(|v| !v.is_null()) {
                        self.count_non_null += 1;
                    }
                }
            }
            AggregateFunction::Sum | AggregateFunction::Avg => {
                if let Some(value) = self.spec.column.as_deref().and_then(|c| row.get(c)) {
                    if !value.is_null() && self.sum.add(value) {
                        self.count_non_null += 1;
                    }
                }
            }
            AggregateFunction::Min => {
                if let Some(value) = self.spec.column.as_deref().and_then(|c| row.get(c)) {
                    if !value.is_null() {
                        let replace = match &self.min {
                            None => true,
                            Some(current) => value.compare(current) == Some(Ordering::Less),
                        };
                        if replace {
                            self.min = Some(value.clone());
                        }
                    }
                }
            }
            AggregateFunction::Max => {
                if let Some(value) = self.spec.column.as_deref().and_then(|c| row.get(c)) {
                    if !value.is_null() {
                        let replace = match &self.max {
                            None => true,
                            Some(current) => value.compare(current) == Some(Ordering::Greater),
                        };
                        if replace {
                            self.max = Some(value.clone());
                        }
                    }
                }
            }
        }
    }

    /// Produce this aggregator's result for the group. COUNT over an empty
    /// group yields 0; SUM/AVG/MIN/MAX yield NULL.
    pub fn finalize(&self) -> Value {
        match self.spec.function {
            AggregateFunction::Count => {
                let n = if self.spec.column.is_some() { self.count_non_null } else { self.count_all };
                Value::Integer(n as i64)
            }
            AggregateFunction::Sum => self.sum.into_value(),
            AggregateFunction::Avg => {
                if self.count_non_null == 0 {
                    Value::Null
                } else {
                    Value::Float(self.sum.as_f64().unwrap_or(0.0) / self.count_non_null as f64)
                }
            }
            AggregateFunction::Min => self.min.clone().unwrap_or(Value::Null),
            AggregateFunction::Max => self.max.clone().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn row(amount: Option<i64>) -> Row {
        let mut r: Row = IndexMap::new();
        match amount {
            Some(a) => r.insert("amount".to_string(), Value::Integer(a)),
            None => r.insert("amount".to_string(), Value::Null),
        };
        r
    }

    #[test]
    fn sum_skips_null_and_stays_integer() {
        let mut acc = Accumulator::new(Aggregate { function: AggregateFunction::Sum, column: Some("amount".into()), alias: None });
        acc.update(&row(Some(100)));
        acc.update(&row(None));
        acc.update(&row(Some(200)));
        assert!(matches!(acc.finalize(), Value::Integer(300)));
    }

    #[test]
    fn sum_over_no_numeric_values_is_null() {
        let acc = Accumulator::new(Aggregate { function: AggregateFunction::Sum, column: Some("amount".into()), alias: None });
        assert!(matches!(acc.finalize(), Value::Null));
    }

    #[test]
    fn count_star_counts_every_row_including_null_columns() {
        let mut acc = Accumulator::new(Aggregate { function: AggregateFunction::Count, column: None, alias: None });
        acc.update(&row(None));
        acc.update(&row(Some(1)));
        assert!(matches!(acc.finalize(), Value::Integer(2)));
    }

    #[test]
    fn avg_is_null_when_count_is_zero() {
        let acc = Accumulator::new(Aggregate { function: AggregateFunction::Avg, column: Some("amount".into()), alias: None });
        assert!(matches!(acc.finalize(), Value::Null));
    }
}
