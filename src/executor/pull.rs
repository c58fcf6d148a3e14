//! Walks the AST, building the pull-iterator operator tree bottom-up:
//! Scan → (HashJoin with a right-branch Scan, if JOIN) → Filter (WHERE) →
//! HashGroupBy (if GROUP BY/aggregates) → OrderBy (if ORDER BY) → Project
//! (unless GROUP BY already emitted the target columns) → Limit
//! "Plan construction"). The `ExplainNode` tree is built in lock-step so
//! `explain()` doesn't need a second pass over the plan.

use crate::error::{Result, TabqlError};
use crate::operators::filter::FilterOp;
use crate::operators::group_by::HashGroupByOp;
use crate::operators::join::HashJoinOp;
use crate::operators::limit::LimitOp;
use crate::operators::order_by::OrderByOp;
use crate::operators::project::ProjectOp;
use crate::operators::scan::ScanOp;
use crate::operators::ExplainNode;
use crate::reader::Reader;
use crate::sql::ast::{SelectColumns, SelectStatement};
use crate::types::Row;

type RowStream<'a> = Box<dyn Iterator<Item = Row> + 'a>;

/// A constructed pull plan: a lazy row stream plus its explain tree.
pub struct PullPlan<'a> {
    pub rows: RowStream<'a>,
    pub explain: ExplainNode,
}

/// Build the operator tree for `stmt` over `primary` (and `right`, for a
/// JOIN). Readers are expected to already have had optimizer hints applied
/// and not yet be iterated (hints are frozen once iteration starts).
pub fn build_plan<'a>(
    stmt: &SelectStatement,
    primary: &'a mut dyn Reader,
    right: Option<&'a mut dyn Reader>,
) -> Result<PullPlan<'a>> {
    let mut rows: RowStream<'a> = Box::new(ScanOp::new(primary)?);
    let mut explain = ExplainNode::leaf(format!("Scan({})", stmt.source));

    if let Some(join) = &stmt.join {
        let right_reader = right.ok_or_else(|| {
            TabqlError::UnsupportedFeature("JOIN requires a right-side reader".to_string())
        })?;
        let right_scan = ScanOp::new(right_reader)?;
        let right_explain = ExplainNode::leaf(format!("Scan({})", join.right_source));

        let join_label = format!(
            "HashJoin({:?}, {} = {})",
            join.join_type, join.left_key, join.right_key
        );
        rows = Box::new(HashJoinOp::new(rows, right_scan, join.join_type, &join.left_key, &join.right_key));
        explain = ExplainNode::join(join_label, explain, right_explain);
    }

    if !stmt.where_clause.is_empty() {
        let label = format!("Filter({} condition(s))", stmt.where_clause.len());
        rows = Box::new(FilterOp::new(rows, stmt.where_clause.clone()));
        explain = ExplainNode::wrap(label, explain);
    }

    let has_aggregation = !stmt.group_by.is_empty() || !stmt.aggregates.is_empty();
    if has_aggregation {
        let label = format!(
            "HashGroupBy({} group col(s), {} aggregate(s))",
            stmt.group_by.len(),
            stmt.aggregates.len()
        );
        rows = Box::new(HashGroupByOp::new(rows, stmt.group_by.clone(), stmt.aggregates.clone()));
        explain = ExplainNode::wrap(label, explain);
    }

    if !stmt.order_by.is_empty() {
        let label = format!("OrderBy({} key(s))", stmt.order_by.len());
        rows = Box::new(OrderByOp::new(rows, stmt.order_by.clone()));
        explain = ExplainNode::wrap(label, explain);
    }

    // GROUP BY already emits exactly the group columns + aggregate aliases,
    // so Project would have nothing left to do.
    if !has_aggregation {
        if let SelectColumns::List(cols) = &stmt.columns {
            let label = format!("Project({})", cols.join(", "));
            rows = Box::new(ProjectOp::new(rows, stmt.columns.clone()));
            explain = ExplainNode::wrap(label, explain);
        }
    }

    if let Some(limit) = stmt.limit {
        let label = format!("Limit({limit})");
        rows = Box::new(LimitOp::new(rows, limit));
        explain = ExplainNode::wrap(label, explain);
    }

    Ok(PullPlan { rows, explain })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use crate::sql::parser::parse;
    use std::io::Write;

    fn temp_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn end_to_end_where_limit() {
        let file = temp_csv("name,age,city\nAlice,30,NYC\nBob,25,LA\nCharlie,35,NYC\n");
        let mut reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT name FROM data WHERE age > 25 LIMIT 2").unwrap();
        let plan = build_plan(&stmt, &mut reader, None).unwrap();
        let rows: Vec<Row> = plan.rows.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").unwrap().to_string(), "Alice");
        assert_eq!(rows[1].get("name").unwrap().to_string(), "Charlie");
    }

    #[test]
    fn explain_renders_operator_tree() {
        let file = temp_csv("a\n1\n");
        let mut reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT a FROM t WHERE a > 0 LIMIT 1").unwrap();
        let plan = build_plan(&stmt, &mut reader, None).unwrap();
        let rendered = plan.explain.render();
        assert!(rendered.starts_with("Limit(1)"));
        assert!(rendered.contains("Filter"));
        assert!(rendered.contains("Scan(t)"));
    }
}
