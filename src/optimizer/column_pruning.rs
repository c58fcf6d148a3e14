//! Push the set of columns actually referenced by the query to a reader that
//! supports column selection. Applicable whenever SELECT isn't `*`.

use super::OptimizationRule;
use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

pub struct ColumnPruning;

impl OptimizationRule for ColumnPruning {
    fn name(&self) -> &'static str {
        "column_pruning"
    }

    fn can_optimize(&self, stmt: &SelectStatement, reader: &dyn Reader) -> bool {
        reader.supports_column_selection() && !matches!(stmt.columns, crate::sql::ast::SelectColumns::Star)
    }

    fn apply(&self, stmt: &mut SelectStatement, reader: &mut dyn Reader) -> String {
        let columns = stmt.referenced_columns();
        reader.set_columns(columns.clone());
        format!("{} column(s) selected", columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use crate::sql::parser::parse;
    use std::io::Write;

    #[test]
    fn required_columns_cover_select_where_and_order_by() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"name,age,city\nAlice,30,NYC\n").unwrap();
        let mut reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let mut stmt = parse("SELECT name FROM data WHERE age > 25 ORDER BY city").unwrap();
        assert!(ColumnPruning.can_optimize(&stmt, &reader));
        ColumnPruning.apply(&mut stmt, &mut reader);
    }

    #[test]
    fn star_select_is_not_pruned() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"name\na\n").unwrap();
        let reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT * FROM data").unwrap();
        assert!(!ColumnPruning.can_optimize(&stmt, &reader));
    }
}
