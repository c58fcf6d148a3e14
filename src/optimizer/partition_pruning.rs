//! Push conditions over Hive-style partition columns to a reader that
//! reports partition support, and rewrite the AST to drop them from WHERE:
//! partition columns are virtual (injected only after a row is read), so
//! leaving the predicate in WHERE would make ordinary row-level filtering
//! reference a column that doesn't exist yet.

use super::OptimizationRule;
use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

pub struct PartitionPruning;

impl OptimizationRule for PartitionPruning {
    fn name(&self) -> &'static str {
        "partition_pruning"
    }

    fn can_optimize(&self, stmt: &SelectStatement, reader: &dyn Reader) -> bool {
        if !reader.supports_partition_pruning() || stmt.where_clause.is_empty() {
            return false;
        }
        let partition_cols = reader.partition_columns();
        stmt.where_clause.iter().any(|c| partition_cols.contains(&c.column))
    }

    fn apply(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> String {
        let partition_cols = reader.partition_columns();
        let (partition_conditions, rest): (Vec<_>, Vec<_>) =
            stmt.where_clause.drain(..).partition(|c| partition_cols.contains(&c.column));
        let count = partition_conditions.len();
        reader.set_partition_filters(partition_conditions);
        stmt.where_clause = rest;
        format!("{count} partition filter(s)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parquet::ParquetReader;
    use crate::sql::parser::parse;

    #[test]
    fn strips_partition_predicate_from_where() {
        let mut reader = ParquetReader::new("data/year=2024/month=01/f.parquet");
        let mut stmt = parse("SELECT * FROM data WHERE year = 2024").unwrap();
        assert!(PartitionPruning.can_optimize(&stmt, &reader));
        PartitionPruning.apply(&mut stmt, &mut reader);
        assert!(stmt.where_clause.is_empty());
    }

    #[test]
    fn leaves_non_partition_predicates_in_where() {
        let mut reader = ParquetReader::new("data/year=2024/f.parquet");
        let mut stmt = parse("SELECT * FROM data WHERE year = 2024 AND age > 18").unwrap();
        PartitionPruning.apply(&mut stmt, &mut reader);
        assert_eq!(stmt.where_clause.len(), 1);
        assert_eq!(stmt.where_clause[0].column, "age");
    }
}
