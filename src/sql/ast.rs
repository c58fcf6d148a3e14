//! Typed representation of the supported SELECT subset.

use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Ne => "!=",
        }
    }
}

/// A simple condition: `column op literal`. Only simple conditions
/// participate in pushdown.
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// `COUNT(*)`, `SUM(col)`, etc, optionally aliased.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub function: AggregateFunction,
    /// `None` represents `*` (only valid for COUNT).
    pub column: Option<String>,
    pub alias: Option<String>,
}

impl Aggregate {
    /// Default alias: `"{func}_{col}"`, lowercased function name; `*` becomes
    /// the literal column name `star`, matching the original's convention of
    /// always substituting something nameable for `*`.
    pub fn effective_alias(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let col = self.column.as_deref().unwrap_or("star");
        format!("{}_{}", self.function.name(), col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct JoinClause {
    pub right_source: String,
    pub join_type: JoinType,
    pub left_key: String,
    pub right_key: String,
}

/// Either every column (`*`) or an explicit projection list.
#[derive(Debug, Clone)]
pub enum SelectColumns {
    Star,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub columns: SelectColumns,
    pub source: String,
    pub join: Option<JoinClause>,
    pub where_clause: Vec<Condition>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

impl SelectStatement {
    /// Columns referenced anywhere in the statement (SELECT, WHERE, GROUP BY,
    /// ORDER BY, aggregate arguments, left join key) — used by column pruning.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut cols = Vec::new();
        if let SelectColumns::List(list) = &self.columns {
            cols.extend(list.iter().cloned());
        }
        for cond in &self.where_clause {
            cols.push(cond.column.clone());
        }
        for g in &self.group_by {
            cols.push(g.clone());
        }
        for o in &self.order_by {
            cols.push(o.column.clone());
        }
        for agg in &self.aggregates {
            if let Some(c) = &agg.column {
                cols.push(c.clone());
            }
        }
        if let Some(join) = &self.join {
            cols.push(join.left_key.clone());
        }
        cols.sort();
        cols.dedup();
        cols
    }
}
