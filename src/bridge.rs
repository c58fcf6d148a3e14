//! External fallback bridge: for out-of-subset queries, registers
//! every discovered source as a DataFusion table, rewrites the raw SQL to
//! reference the sanitized logical names, and delegates execution to
//! DataFusion's own SQL engine. This module is the only place that engine
//! is named; `Query` talks to it purely through `execute_raw`/`explain`.

use indexmap::IndexMap;

use datafusion::prelude::SessionContext;

use crate::config::EngineConfig;
use crate::discovery::discover_sources;
use crate::error::{Result, TabqlError};
use crate::executor::vectorized::batches_to_rows;
use crate::registry::register_source;
use crate::types::Row;

pub struct Bridge {
    runtime: tokio::runtime::Runtime,
}

impl Bridge {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| TabqlError::DependencyMissing(format!("tokio runtime unavailable: {e}")))?;
        Ok(Self { runtime })
    }

    /// Runs `sql` (already known to be out-of-subset) against freshly
    /// discovered sources and returns every result row.
    pub fn execute_raw(&self, sql: &str, config: &EngineConfig) -> Result<Vec<Row>> {
        self.runtime.block_on(execute_raw_async(sql, config))
    }

    /// DataFusion's own textual plan for `sql`, for `QueryResult::explain`
    /// when the external backend is in use.
    pub fn explain(&self, sql: &str, config: &EngineConfig) -> Result<String> {
        self.runtime.block_on(explain_async(sql, config))
    }
}

async fn prepare(sql: &str, config: &EngineConfig) -> Result<(SessionContext, String)> {
    let sources = discover_sources(sql);
    if sources.is_empty() {
        return Err(TabqlError::NotFound(format!("no table references found in: {sql}")));
    }

    let ctx = SessionContext::new();
    for (logical_name, reference) in &sources {
        register_source(&ctx, logical_name, reference, config).await?;
    }

    Ok((ctx, rewrite_sql(sql, &sources)))
}

async fn execute_raw_async(sql: &str, config: &EngineConfig) -> Result<Vec<Row>> {
    let (ctx, rewritten) = prepare(sql, config).await?;
    let df = ctx
        .sql(&rewritten)
        .await
        .map_err(|e| TabqlError::ParseError(format!("external engine rejected query: {e}")))?;
    let batches = df.collect().await.map_err(|e| TabqlError::TypeError(format!("query execution failed: {e}")))?;
    batches_to_rows(&batches)
}

async fn explain_async(sql: &str, config: &EngineConfig) -> Result<String> {
    let (ctx, rewritten) = prepare(sql, config).await?;
    let df = ctx
        .sql(&rewritten)
        .await
        .map_err(|e| TabqlError::ParseError(format!("external engine rejected query: {e}")))?;
    let batches = df
        .explain(false, false)
        .map_err(|e| TabqlError::TypeError(format!("explain failed: {e}")))?
        .collect()
        .await
        .map_err(|e| TabqlError::TypeError(format!("explain failed: {e}")))?;
    let rows = batches_to_rows(&batches)?;
    let lines: Vec<String> =
        rows.into_iter().map(|r| r.values().map(ToString::to_string).collect::<Vec<_>>().join(": ")).collect();
    Ok(lines.join("\n"))
}

/// Replace each discovered reference with its double-quoted logical name:
/// quoted occurrences (`'ref'`/`"ref"`) first, consuming the surrounding
/// quotes, then bare-path occurrences guarded by a manual path-character
/// boundary check (the `regex` crate has no lookaround, so this walks the
/// string instead). Longest reference first so one reference that's a
/// substring of another (e.g. `a/x.csv` vs `b/x.csv` sharing `x.csv`) never
/// gets partially clobbered by a shorter match.
fn rewrite_sql(sql: &str, sources: &IndexMap<String, String>) -> String {
    let mut refs: Vec<(&String, &String)> = sources.iter().collect();
    refs.sort_by_key(|(_, reference)| std::cmp::Reverse(reference.len()));

    let mut out = sql.to_string();
    for (logical_name, reference) in &refs {
        out = out.replace(&format!("'{reference}'"), &format!("\"{logical_name}\""));
        out = out.replace(&format!("\"{reference}\""), &format!("\"{logical_name}\""));
    }
    for (logical_name, reference) in &refs {
        out = substitute_bare(&out, reference, logical_name);
    }
    out
}

fn is_path_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'/' | b'.' | b'_' | b'-' | b'#' | b':')
}

fn substitute_bare(text: &str, reference: &str, logical_name: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with(reference) {
            let before_ok = i == 0 || !is_path_char(bytes[i - 1]);
            let after = i + reference.len();
            let after_ok = after >= bytes.len() || !is_path_char(bytes[after]);
            if before_ok && after_ok {
                out.push('"');
                out.push_str(logical_name);
                out.push('"');
                i = after;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_quoted_reference_to_logical_name() {
        let mut sources = IndexMap::new();
        sources.insert("data".to_string(), "data.csv".to_string());
        let rewritten = rewrite_sql("SELECT * FROM 'data.csv'", &sources);
        assert_eq!(rewritten, "SELECT * FROM \"data\"");
    }

    #[test]
    fn rewrites_bare_reference_without_clobbering_neighbors() {
        let mut sources = IndexMap::new();
        sources.insert("sales".to_string(), "data/sales.csv".to_string());
        let rewritten = rewrite_sql("SELECT * FROM data/sales.csv WHERE region = 'E'", &sources);
        assert_eq!(rewritten, "SELECT * FROM \"sales\" WHERE region = 'E'");
    }

    #[test]
    fn longest_reference_wins_when_one_is_a_suffix_of_another() {
        let mut sources = IndexMap::new();
        sources.insert("x".to_string(), "a/x.csv".to_string());
        sources.insert("x_2".to_string(), "b/x.csv".to_string());
        let rewritten = rewrite_sql("SELECT * FROM 'a/x.csv' JOIN 'b/x.csv' ON a.id = b.id", &sources);
        assert_eq!(rewritten, "SELECT * FROM \"x\" JOIN \"x_2\" ON a.id = b.id");
    }
}
