//! Ordered pipeline of rewrite rules that annotate a reader with pushdown
//! hints (predicates, projected columns, row limits, partition filters)
//! before any iteration begins — see `reader::Reader`'s "frozen after
//! iteration starts" contract for why these rules must run first.

pub mod column_pruning;
pub mod limit_pushdown;
pub mod partition_pruning;
pub mod placeholders;
pub mod predicate_pushdown;

use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

/// One optimizer rule. `can_optimize` is queried before `apply` so the
/// pipeline can record which rules actually fired; `apply` may mutate both
/// the reader (hint setters) and the statement (e.g. partition pruning
/// strips pushed conditions from WHERE).
pub trait OptimizationRule {
    /// Human-readable rule name, used in the summary string.
    fn name(&self) -> &'static str;

    fn can_optimize(&self, stmt: &SelectStatement, reader: &dyn Reader) -> bool;

    /// Apply the rule, returning a short description of what it did (e.g.
    /// `"2 condition(s)"`) for the summary string. Only called when
    /// `can_optimize` returned true.
    fn apply(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> String;
}

/// One entry in the optimizer's summary: which rule ran and what it did.
#[derive(Debug, Clone)]
pub struct AppliedRule {
    pub rule: &'static str,
    pub description: String,
}

/// Runs every rule, in fixed order, against the primary reader. Each rule is
/// a no-op when `can_optimize` returns false. Projection pushdown, join
/// reordering, and cost-based optimization are present but permanently
/// disabled placeholders.
pub struct OptimizerPipeline {
    rules: Vec<Box<dyn OptimizationRule>>,
}

impl Default for OptimizerPipeline {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(predicate_pushdown::PredicatePushdown),
                Box::new(column_pruning::ColumnPruning),
                Box::new(limit_pushdown::LimitPushdown),
                Box::new(partition_pruning::PartitionPruning),
                Box::new(placeholders::ProjectionPushdown),
                Box::new(placeholders::JoinReordering),
                Box::new(placeholders::CostBasedOptimization),
            ],
        }
    }
}

impl OptimizerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every rule in order against `stmt`/`reader`, returning the applied
    /// subset with each rule's description.
    pub fn optimize(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> Vec<AppliedRule> {
        let mut applied = Vec::new();
        for rule in &self.rules {
            if rule.can_optimize(stmt, reader) {
                let description = rule.apply(stmt, reader);
                applied.push(AppliedRule { rule: rule.name(), description });
            }
        }
        applied
    }

    /// A human-readable summary of which rules fired, in pipeline order.
    pub fn summarize(applied: &[AppliedRule]) -> String {
        if applied.is_empty() {
            return "no optimizations applied".to_string();
        }
        applied
            .iter()
            .map(|a| format!("{}: {}", a.rule, a.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
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
    fn pipeline_applies_predicate_and_limit_pushdown() {
        let file = temp_csv("name,age\nAlice,30\nBob,25\n");
        let mut reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let mut stmt = parse("SELECT name FROM data WHERE age > 25 LIMIT 2").unwrap();
        let pipeline = OptimizerPipeline::new();
        let applied = pipeline.optimize(&mut stmt, &mut reader);
        let names: Vec<&str> = applied.iter().map(|a| a.rule).collect();
        assert!(names.contains(&"predicate_pushdown"));
        assert!(names.contains(&"limit_pushdown"));
        assert!(names.contains(&"column_pruning"));
    }
}
