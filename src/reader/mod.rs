//! Common contract for all data sources: lazy row iteration plus capability
//! negotiation for pushdown.

pub mod csv;
pub mod html;
pub mod http;
pub mod json;
pub mod jsonl;
pub mod markdown;
pub mod parallel;
pub mod parquet;
pub mod xml;

use crate::error::Result;
use crate::schema::{Schema, TableStatistics};
use crate::sql::ast::Condition;
use crate::types::Row;

/// Every reader exposes hint setters (mutate-before-iterate, a
/// default-method capability-dispatch pattern) and a restartable lazy row
/// iterator. Setters are
/// idempotent and last-writer-wins; they must never trigger I/O — only
/// `read_lazy`/`get_schema` may touch the underlying source.
pub trait Reader {
    /// A bounded-sample schema, or `None` for an empty source.
    fn get_schema(&mut self) -> Result<Option<Schema>>;

    /// Produce rows in source order. Honoring any set hints is best-effort:
    /// the executor re-applies filters/projections on top regardless.
    fn read_lazy(&mut self) -> Result<Box<dyn Iterator<Item = Row> + '_>>;

    fn supports_pushdown(&self) -> bool {
        false
    }

    fn supports_column_selection(&self) -> bool {
        false
    }

    fn supports_limit(&self) -> bool {
        false
    }

    fn supports_partition_pruning(&self) -> bool {
        false
    }

    fn set_filter(&mut self, _conditions: Vec<Condition>) {}

    fn set_columns(&mut self, _columns: Vec<String>) {}

    fn set_limit(&mut self, _limit: u64) {}

    fn set_partition_filters(&mut self, _conditions: Vec<Condition>) {}

    /// Present only for readers whose format carries partition columns
    /// (currently Parquet). Default: no partition columns.
    fn partition_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn get_statistics(&self) -> Option<TableStatistics> {
        None
    }
}

/// Accumulated hint state the optimizer builds up before any reader is
/// constructed or iterated (the builder-pattern resolution for reader config).
/// Not all readers need this — the ones whose hints are cheap to apply via
/// plain `&mut self` setters use those directly — but it gives the optimizer
/// a single place to stage hints when a reader must be (re)built from
/// scratch to apply them (e.g. Parquet's column-projection primitive).
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    pub filter: Vec<Condition>,
    pub columns: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub partition_filters: Vec<Condition>,
}
