//! Push simple WHERE conditions to a reader that supports pushdown. Skipped
//! entirely when the query has a JOIN, keeping cross-table predicate
//! analysis out of scope.

use super::OptimizationRule;
use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

pub struct PredicatePushdown;

impl OptimizationRule for PredicatePushdown {
    fn name(&self) -> &'static str {
        "predicate_pushdown"
    }

    fn can_optimize(&self, stmt: &SelectStatement, reader: &dyn Reader) -> bool {
        !stmt.where_clause.is_empty() && reader.supports_pushdown() && stmt.join.is_none()
    }

    fn apply(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> String {
        reader.set_filter(stmt.where_clause.clone());
        format!("{} condition(s)", stmt.where_clause.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use crate::sql::parser::parse;
    use std::io::Write;

    #[test]
    fn skips_when_join_present() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"id,name\n1,a\n").unwrap();
        let reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT name FROM c LEFT JOIN o ON id = customer_id").unwrap();
        assert!(!PredicatePushdown.can_optimize(&stmt, &reader));
    }
}
