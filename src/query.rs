//! Public entry point: `Query` binds an optional default source,
//! `Query::sql` parses/classifies/routes a statement to one of three
//! back-ends, and the resulting `QueryResult` exposes rows, an explain
//! string, and the primary source's schema.

use crate::bridge::Bridge;
use crate::config::{BackendPreference, EngineConfig};
use crate::discovery::discover_sources;
use crate::error::{Result, TabqlError};
use crate::executor::pull;
use crate::executor::vectorized::VectorizedExecutor;
use crate::optimizer::OptimizerPipeline;
use crate::registry;
use crate::schema::Schema;
use crate::sql::classifier;
use crate::sql::parser::parse;
use crate::sql::ast::SelectStatement;
use crate::types::Row;

/// Which back-end should run a query; `Auto` lets `backend_preference`
/// pick between the two in-subset executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Auto,
    Python,
    Vectorized,
    External,
}

enum ResolvedBackend {
    Python,
    Vectorized,
    External,
}

/// Binds an optional default source reference so SQL text can name a bare
/// placeholder table (e.g. `FROM data`) instead of a literal path.
pub struct Query {
    config: EngineConfig,
    default_source: Option<String>,
}

impl Query {
    /// Eagerly constructs a reader for `source`, if given, so a bad path
    /// fails at construction rather than on first iteration.
    pub fn new(source: Option<&str>, config: EngineConfig) -> Result<Self> {
        if let Some(src) = source {
            registry::build_reader(src, &config)?;
        }
        Ok(Self { config, default_source: source.map(String::from) })
    }

    pub fn sql(&self, text: &str, backend: Backend) -> Result<QueryResult> {
        QueryResult::build(text, backend, self.default_source.as_deref(), &self.config)
    }
}

pub struct QueryResult {
    rows: Vec<Row>,
    explain_text: String,
    schema: Schema,
}

impl QueryResult {
    fn build(text: &str, backend: Backend, default_source: Option<&str>, config: &EngineConfig) -> Result<Self> {
        // Step 1: in-subset iff the classifier accepts it AND it actually parses.
        let syntactically_in_subset = classifier::is_in_subset(text);
        let parsed = if syntactically_in_subset { parse(text).ok() } else { None };
        let in_subset = parsed.is_some();

        let resolved = resolve_backend(backend, in_subset, config)?;

        match resolved {
            ResolvedBackend::External => Self::run_external(text, config),
            ResolvedBackend::Vectorized => {
                let stmt = parsed.expect("resolve_backend only returns Vectorized when in_subset");
                Self::run_vectorized(&stmt, default_source, config)
            }
            ResolvedBackend::Python => {
                let stmt = parsed.expect("resolve_backend only returns Python when in_subset");
                Self::run_python(stmt, default_source, config)
            }
        }
    }

    fn run_external(text: &str, config: &EngineConfig) -> Result<Self> {
        let bridge = Bridge::new()?;
        let rows = bridge.execute_raw(text, config)?;
        let explain_text = bridge.explain(text, config)?;
        let schema = external_primary_schema(text, config).unwrap_or_default();
        Ok(Self { rows, explain_text, schema })
    }

    fn run_vectorized(stmt: &SelectStatement, default_source: Option<&str>, config: &EngineConfig) -> Result<Self> {
        let source = resolve_source(stmt, default_source);
        let executor = VectorizedExecutor::new()?;
        let rows = executor.execute(stmt, &source, config)?;
        let explain_text = executor.explain(stmt, &source, config)?;
        let schema = primary_schema(&source, config)?;
        Ok(Self { rows, explain_text, schema })
    }

    fn run_python(mut stmt: SelectStatement, default_source: Option<&str>, config: &EngineConfig) -> Result<Self> {
        let source = resolve_source(&stmt, default_source);
        let mut primary = registry::build_reader(&source, config)?;

        let mut right = match &stmt.join {
            Some(join) => Some(registry::build_reader(&join.right_source, config)?),
            None => None,
        };

        let optimizer = OptimizerPipeline::new();
        optimizer.optimize(&mut stmt, primary.as_mut());

        let plan = pull::build_plan(&stmt, primary.as_mut(), right.as_deref_mut())?;
        let explain_text = plan.explain.render();
        let rows: Vec<Row> = plan.rows.collect();
        drop(plan);

        let schema = primary_schema(&source, config)?;
        Ok(Self { rows, explain_text, schema })
    }

    pub fn to_list(&self) -> Vec<Row> {
        self.rows.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn explain(&self) -> &str {
        &self.explain_text
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// `FROM data` in the SQL text is only a real path when no default source is
/// bound; a bound `Query` treats every bare FROM token as a placeholder and
/// substitutes its own source instead.
fn resolve_source(stmt: &SelectStatement, default_source: Option<&str>) -> String {
    default_source.map(str::to_string).unwrap_or_else(|| stmt.source.clone())
}

fn primary_schema(source: &str, config: &EngineConfig) -> Result<Schema> {
    let mut reader = registry::build_reader(source, config)?;
    Ok(reader.get_schema()?.unwrap_or_default())
}

fn external_primary_schema(text: &str, config: &EngineConfig) -> Result<Schema> {
    let sources = discover_sources(text);
    let (_, reference) = sources.iter().next().ok_or_else(|| TabqlError::NotFound("no sources discovered".into()))?;
    primary_schema(reference, config)
}

fn resolve_backend(backend: Backend, in_subset: bool, config: &EngineConfig) -> Result<ResolvedBackend> {
    match backend {
        Backend::External => Ok(ResolvedBackend::External),
        Backend::Vectorized if in_subset => Ok(ResolvedBackend::Vectorized),
        Backend::Vectorized => Err(TabqlError::UnsupportedFeature(
            "vectorized backend requires an in-subset query; use external or auto".to_string(),
        )),
        Backend::Python if in_subset => Ok(ResolvedBackend::Python),
        Backend::Python => Err(TabqlError::UnsupportedFeature(
            "python backend requires an in-subset query; use external or auto".to_string(),
        )),
        Backend::Auto if in_subset => match config.backend_preference {
            BackendPreference::Vectorized => Ok(ResolvedBackend::Vectorized),
            BackendPreference::Pull => Ok(ResolvedBackend::Python),
        },
        Backend::Auto => Ok(ResolvedBackend::External),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn bound_default_source_overrides_bare_from_token() {
        let file = temp_csv("name,age\nAlice,30\nBob,25\nCharlie,35\n");
        let config = EngineConfig::default();
        let query = Query::new(Some(file.path().to_str().unwrap()), config).unwrap();
        let result = query.sql("SELECT name FROM data WHERE age > 25 LIMIT 2", Backend::Python).unwrap();
        let rows = result.to_list();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").unwrap().to_string(), "Alice");
    }

    #[test]
    fn group_by_sum_ordered_descending_through_python_backend() {
        let file = temp_csv("region,amount\nE,100\nE,200\nW,150\nW,250\nE,50\n");
        let config = EngineConfig::default();
        let query = Query::new(Some(file.path().to_str().unwrap()), config).unwrap();
        let result = query
            .sql("SELECT region, SUM(amount) AS total FROM s GROUP BY region ORDER BY total DESC", Backend::Python)
            .unwrap();
        let rows = result.to_list();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("region").unwrap().to_string(), "W");
        assert!(matches!(rows[0].get("total"), Some(crate::types::Value::Integer(400))));
        assert_eq!(rows[1].get("region").unwrap().to_string(), "E");
        assert!(matches!(rows[1].get("total"), Some(crate::types::Value::Integer(350))));
    }

    #[test]
    fn vectorized_backend_rejects_out_of_subset_query() {
        let config = EngineConfig::default();
        let query = Query::new(None, config).unwrap();
        let err = query.sql("WITH t AS (SELECT 1) SELECT * FROM t", Backend::Vectorized);
        assert!(err.is_err());
    }

    #[test]
    fn auto_backend_prefers_configured_in_subset_executor() {
        let file = temp_csv("name,age\nAlice,30\n");
        let mut config = EngineConfig::default();
        config.backend_preference = BackendPreference::Pull;
        let query = Query::new(Some(file.path().to_str().unwrap()), config).unwrap();
        let result = query.sql("SELECT name FROM data", Backend::Auto).unwrap();
        assert_eq!(result.to_list().len(), 1);
    }
}
