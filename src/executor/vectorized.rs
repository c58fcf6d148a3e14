//! Alternate back-end: loads the primary (and, for a JOIN, the
//! right-side) source as a DataFusion table and evaluates the same AST via
//! the `DataFrame` API instead of the pull-iterator tree — `filter` for
//! WHERE, `aggregate` for GROUP BY, `sort` for ORDER BY (NULLs last),
//! `select` for projection, `limit` for LIMIT. Table registration is shared
//! with the external bridge via `registry::register_source`; everything
//! past that point is DataFusion's own `DataFrame` method chain.

use datafusion::arrow::record_batch::RecordBatch;
use datafusion::logical_expr::JoinType as DfJoinType;
use datafusion::prelude::{col, lit, SessionContext};
use datafusion::scalar::ScalarValue;

use datafusion::functions_aggregate::expr_fn::{avg, count, max, min, sum};

use crate::config::EngineConfig;
use crate::error::{Result, TabqlError};
use crate::registry::register_source;
use crate::sql::ast::{Aggregate, AggregateFunction, CompareOp, Condition, JoinType, SelectColumns, SelectStatement};
use crate::types::{Row, Value};

/// Runs the AST-driven columnar path. Owns a Tokio runtime to bridge this
/// module's blocking public API onto DataFusion's async `DataFrame`.
pub struct VectorizedExecutor {
    runtime: tokio::runtime::Runtime,
}

impl VectorizedExecutor {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| TabqlError::DependencyMissing(format!("tokio runtime unavailable: {e}")))?;
        Ok(Self { runtime })
    }

    /// Materialize every result row for `stmt` over `primary_ref` (and the
    /// JOIN's right-side source, if any).
    pub fn execute(&self, stmt: &SelectStatement, primary_ref: &str, config: &EngineConfig) -> Result<Vec<Row>> {
        self.runtime.block_on(execute_async(stmt, primary_ref, config))
    }

    /// The DataFusion engine's own textual plan, for `QueryResult::explain`
    /// when the vectorized backend is in use.
    pub fn explain(&self, stmt: &SelectStatement, primary_ref: &str, config: &EngineConfig) -> Result<String> {
        self.runtime.block_on(explain_async(stmt, primary_ref, config))
    }
}

async fn build_dataframe(
    ctx: &SessionContext,
    stmt: &SelectStatement,
    primary_ref: &str,
    config: &EngineConfig,
) -> Result<datafusion::dataframe::DataFrame> {
    register_source(ctx, "primary", primary_ref, config).await?;
    let mut df = ctx
        .table("primary")
        .await
        .map_err(|e| TabqlError::ParseError(format!("loading {primary_ref}: {e}")))?;

    if let Some(join) = &stmt.join {
        register_source(ctx, "joined", &join.right_source, config).await?;
        let right_df = ctx
            .table("joined")
            .await
            .map_err(|e| TabqlError::ParseError(format!("loading {}: {e}", join.right_source)))?;
        df = df
            .join(right_df, df_join_type(join.join_type), &[join.left_key.as_str()], &[join.right_key.as_str()], None)
            .map_err(|e| TabqlError::TypeError(format!("join failed: {e}")))?;
    }

    if !stmt.where_clause.is_empty() {
        df = df
            .filter(build_filter_expr(&stmt.where_clause))
            .map_err(|e| TabqlError::TypeError(format!("filter failed: {e}")))?;
    }

    let has_aggregation = !stmt.group_by.is_empty() || !stmt.aggregates.is_empty();
    if has_aggregation {
        let group_exprs = stmt.group_by.iter().map(|c| col(c)).collect::<Vec<_>>();
        let agg_exprs = stmt.aggregates.iter().map(build_aggregate_expr).collect::<Vec<_>>();
        df = df
            .aggregate(group_exprs, agg_exprs)
            .map_err(|e| TabqlError::TypeError(format!("aggregate failed: {e}")))?;
    }

    if !stmt.order_by.is_empty() {
        let sort_exprs = stmt
            .order_by
            .iter()
            .map(|item| col(&item.column).sort(item.direction == crate::sql::ast::SortDirection::Asc, false))
            .collect::<Vec<_>>();
        df = df.sort(sort_exprs).map_err(|e| TabqlError::TypeError(format!("sort failed: {e}")))?;
    }

    if !has_aggregation {
        if let SelectColumns::List(cols) = &stmt.columns {
            let exprs = cols.iter().map(|c| col(c)).collect::<Vec<_>>();
            df = df.select(exprs).map_err(|e| TabqlError::TypeError(format!("project failed: {e}")))?;
        }
    }

    if let Some(limit) = stmt.limit {
        df = df.limit(0, Some(limit as usize)).map_err(|e| TabqlError::TypeError(format!("limit failed: {e}")))?;
    }

    Ok(df)
}

async fn execute_async(stmt: &SelectStatement, primary_ref: &str, config: &EngineConfig) -> Result<Vec<Row>> {
    let ctx = SessionContext::new();
    let df = build_dataframe(&ctx, stmt, primary_ref, config).await?;
    let batches = df.collect().await.map_err(|e| TabqlError::TypeError(format!("query execution failed: {e}")))?;
    batches_to_rows(&batches)
}

async fn explain_async(stmt: &SelectStatement, primary_ref: &str, config: &EngineConfig) -> Result<String> {
    let ctx = SessionContext::new();
    let df = build_dataframe(&ctx, stmt, primary_ref, config).await?;
    let batches = df
        .explain(false, false)
        .map_err(|e| TabqlError::TypeError(format!("explain failed: {e}")))?
        .collect()
        .await
        .map_err(|e| TabqlError::TypeError(format!("explain failed: {e}")))?;
    let rows = batches_to_rows(&batches)?;
    let lines: Vec<String> = rows.into_iter().map(|r| r.values().map(ToString::to_string).collect::<Vec<_>>().join(": ")).collect();
    Ok(lines.join("\n"))
}

fn df_join_type(join_type: JoinType) -> DfJoinType {
    match join_type {
        JoinType::Inner => DfJoinType::Inner,
        JoinType::Left => DfJoinType::Left,
        JoinType::Right => DfJoinType::Right,
    }
}

fn build_filter_expr(conditions: &[Condition]) -> datafusion::prelude::Expr {
    conditions
        .iter()
        .map(build_condition_expr)
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| lit(true))
}

fn build_condition_expr(condition: &Condition) -> datafusion::prelude::Expr {
    let column = col(&condition.column);
    let literal = value_to_expr(&condition.value);
    match condition.op {
        CompareOp::Eq => column.eq(literal),
        CompareOp::Ne => column.not_eq(literal),
        CompareOp::Gt => column.gt(literal),
        CompareOp::Lt => column.lt(literal),
        CompareOp::Ge => column.gt_eq(literal),
        CompareOp::Le => column.lt_eq(literal),
    }
}

/// Native `Expr` literals for the categories that round-trip cleanly through
/// Arrow; everything else (DATE/TIME/DATETIME/DECIMAL/JSON) compares against
/// its textual form, matching how `registry::rows_to_record_batch` stores
/// those categories as `Utf8` for any source materialized through our own
/// reader layer.
fn value_to_expr(value: &Value) -> datafusion::prelude::Expr {
    match value {
        Value::Integer(i) => lit(*i),
        Value::Float(f) => lit(*f),
        Value::Boolean(b) => lit(*b),
        Value::Str(s) => lit(s.clone()),
        Value::Null => lit(ScalarValue::Utf8(None)),
        other => lit(other.to_string()),
    }
}

/// COUNT(*) has no column to aggregate over; DataFusion has no direct
/// wildcard-count `Expr` builder in the function form used here, so it's
/// expressed as `COUNT(1)`, which counts rows identically.
fn build_aggregate_expr(aggregate: &Aggregate) -> datafusion::prelude::Expr {
    let alias = aggregate.effective_alias();
    let expr = match (aggregate.function, &aggregate.column) {
        (AggregateFunction::Count, None) => count(lit(1i64)),
        (AggregateFunction::Count, Some(c)) => count(col(c)),
        (AggregateFunction::Sum, Some(c)) => sum(col(c)),
        (AggregateFunction::Avg, Some(c)) => avg(col(c)),
        (AggregateFunction::Min, Some(c)) => min(col(c)),
        (AggregateFunction::Max, Some(c)) => max(col(c)),
        // Parser never produces SUM/AVG/MIN/MAX with no column; degrade to a
        // row count rather than panicking if it ever did.
        _ => count(lit(1i64)),
    };
    expr.alias(alias)
}

/// Shared with the external fallback bridge, which collects `RecordBatch`es
/// from the same DataFusion `SessionContext::sql` path.
pub(crate) fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for batch in batches {
        let schema = batch.schema();
        for row_idx in 0..batch.num_rows() {
            let mut row = Row::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let array = batch.column(col_idx);
                let scalar = ScalarValue::try_from_array(array, row_idx)
                    .map_err(|e| TabqlError::TypeError(format!("reading column {}: {e}", field.name())))?;
                row.insert(field.name().clone(), scalar_to_value(&scalar));
            }
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Converts any Arrow scalar DataFusion hands back into our `Value`. The
/// exhaustively-matched categories are the ones this engine's own readers
/// produce natively; anything else (temporal/decimal types DataFusion's
/// native CSV/Parquet readers may infer on their own) falls back to its
/// `Display` text, the same degrade-to-string policy the Parquet reader uses
/// for logical-annotation types it doesn't model explicitly.
fn scalar_to_value(scalar: &ScalarValue) -> Value {
    if scalar.is_null() {
        return Value::Null;
    }
    match scalar {
        ScalarValue::Boolean(Some(b)) => Value::Boolean(*b),
        ScalarValue::Int8(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::Int16(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::Int32(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::Int64(Some(i)) => Value::Integer(*i),
        ScalarValue::UInt8(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::UInt16(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::UInt32(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::UInt64(Some(i)) => Value::Integer(*i as i64),
        ScalarValue::Float32(Some(f)) => Value::Float(*f as f64),
        ScalarValue::Float64(Some(f)) => Value::Float(*f),
        ScalarValue::Utf8(Some(s)) | ScalarValue::LargeUtf8(Some(s)) | ScalarValue::Utf8View(Some(s)) => {
            Value::Str(s.clone())
        }
        other => Value::Str(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_star_aggregates_on_a_literal_not_a_column() {
        let agg = Aggregate { function: AggregateFunction::Count, column: None, alias: None };
        // Just exercises the builder path without a live SessionContext.
        let _ = build_aggregate_expr(&agg);
    }
}
