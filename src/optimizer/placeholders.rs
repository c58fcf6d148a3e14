//! Present-but-disabled rules reserved for future work. Each is
//! wired into the pipeline so the summary string and rule ordering are
//! stable, but `can_optimize` always returns false — materializing any of
//! these requires a cost model or cross-table analysis this engine's core
//! doesn't specify (see DESIGN.md Open Question resolutions).

use super::OptimizationRule;
use crate::reader::Reader;
use crate::sql::ast::SelectStatement;

pub struct ProjectionPushdown;

impl OptimizationRule for ProjectionPushdown {
    fn name(&self) -> &'static str {
        "projection_pushdown"
    }

    fn can_optimize(&self, _stmt: &SelectStatement, _reader: &dyn Reader) -> bool {
        false
    }

    fn apply(&self, _stmt: &mut SelectStatement, _reader: &mut dyn Reader) -> String {
        unreachable!("can_optimize always returns false")
    }
}

pub struct JoinReordering;

impl OptimizationRule for JoinReordering {
    fn name(&self) -> &'static str {
        "join_reordering"
    }

    fn can_optimize(&self, _stmt: &SelectStatement, _reader: &dyn Reader) -> bool {
        false
    }

    fn apply(&self, _stmt: &mut SelectStatement, _reader: &mut dyn Reader) -> String {
        unreachable!("can_optimize always returns false")
    }
}

pub struct CostBasedOptimization;

impl OptimizationRule for CostBasedOptimization {
    fn name(&self) -> &'static str {
        "cost_based"
    }

    fn can_optimize(&self, _stmt: &SelectStatement, _reader: &dyn Reader) -> bool {
        false
    }

    fn apply(&self, _stmt: &mut SelectStatement, _reader: &mut dyn Reader) -> String {
        unreachable!("can_optimize always returns false")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use crate::sql::parser::parse;
    use std::io::Write;

    #[test]
    fn placeholders_never_fire() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"a\n1\n").unwrap();
        let reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let stmt = parse("SELECT * FROM t").unwrap();
        assert!(!ProjectionPushdown.can_optimize(&stmt, &reader));
        assert!(!JoinReordering.can_optimize(&stmt, &reader));
        assert!(!CostBasedOptimization.can_optimize(&stmt, &reader));
    }
}
