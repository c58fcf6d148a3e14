//! Push LIMIT to a reader that supports it, short-circuiting I/O. Never
//! applies when ORDER BY, GROUP BY, aggregates, or JOIN are present, since
//! each of those requires a full scan before the limit can be meaningfully
//! applied.

use super::OptimizationRule;
use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

pub struct LimitPushdown;

impl OptimizationRule for LimitPushdown {
    fn name(&self) -> &'static str {
        "limit_pushdown"
    }

    fn can_optimize(&self, stmt: &SelectStatement, reader: &dyn Reader) -> bool {
        stmt.limit.is_some()
            && reader.supports_limit()
            && stmt.order_by.is_empty()
            && stmt.group_by.is_empty()
            && stmt.aggregates.is_empty()
            && stmt.join.is_none()
    }

    fn apply(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> String {
        let limit = stmt.limit.expect("can_optimize guarantees Some");
        reader.set_limit(limit);
        format!("limit {limit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use crate::sql::parser::parse;
    use std::io::Write;

    #[test]
    fn never_applies_alongside_group_by() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"region,amount\nE,100\n").unwrap();
        let reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT region, SUM(amount) AS total FROM s GROUP BY region LIMIT 5").unwrap();
        assert!(!LimitPushdown.can_optimize(&stmt, &reader));
    }

    #[test]
    fn applies_for_plain_limit() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"name\na\n").unwrap();
        let reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT name FROM data LIMIT 2").unwrap();
        assert!(LimitPushdown.can_optimize(&stmt, &reader));
    }
}
