//! Reader selection and the shared source→DataFusion-table
//! registration helper used by both the vectorized executor and the
//! external fallback bridge.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use datafusion::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};

use crate::config::EngineConfig;
use crate::error::{Result, TabqlError};
use crate::fragment::{parse_fragment, Format, Selector};
use crate::reader::csv::CsvReader;
use crate::reader::html::HtmlReader;
use crate::reader::http::HttpReader;
use crate::reader::json::JsonReader;
use crate::reader::jsonl::JsonlReader;
use crate::reader::markdown::MarkdownReader;
use crate::reader::parquet::ParquetReader;
use crate::reader::xml::XmlReader;
use crate::reader::Reader;
use crate::schema::Schema;
use crate::types::{LogicalType, Row, Value};

fn infer_format_from_extension(path: &str) -> Option<Format> {
    let ext = Path::new(path).extension()?.to_str()?;
    Format::from_extension(ext)
}

/// Construct the concrete reader for a local path given an already-resolved
/// format and selector (no further fragment/extension inference).
pub fn construct_reader(path: &str, format: Format, selector: Option<&Selector>) -> Result<Box<dyn Reader>> {
    Ok(match format {
        Format::Csv => Box::new(CsvReader::new(path)?),
        Format::Parquet => Box::new(ParquetReader::new(path)),
        Format::Jsonl => Box::new(JsonlReader::new(path)),
        Format::Json => {
            let records_path = match selector {
                Some(Selector::Path(p)) => Some(p.clone()),
                _ => None,
            };
            Box::new(JsonReader::new(path, records_path))
        }
        Format::Html => {
            let idx = match selector {
                Some(Selector::Index(i)) => *i,
                _ => 0,
            };
            Box::new(HtmlReader::new(path, idx))
        }
        Format::Markdown => {
            let idx = match selector {
                Some(Selector::Index(i)) => *i,
                _ => 0,
            };
            Box::new(MarkdownReader::new(path, idx))
        }
        Format::Xml => {
            let element_path = match selector {
                Some(Selector::Path(p)) => Some(p.clone()),
                _ => None,
            };
            Box::new(XmlReader::new(path, element_path))
        }
    })
}

/// Full reader-selection pipeline: parse the fragment, resolve the
/// format (fragment > extension > CSV default), dispatch `http(s)://` to the
/// caching wrapper, and build the concrete reader.
pub fn build_reader(source_ref: &str, config: &EngineConfig) -> Result<Box<dyn Reader>> {
    let parsed = parse_fragment(source_ref)?;
    let format = parsed
        .format
        .or_else(|| infer_format_from_extension(&parsed.path))
        .unwrap_or(Format::Csv);

    if parsed.path.starts_with("http://") || parsed.path.starts_with("https://") {
        return Ok(Box::new(HttpReader::new(
            parsed.path.clone(),
            format,
            parsed.selector.clone(),
            config.http_cache_dir.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )));
    }

    construct_reader(&parsed.path, format, parsed.selector.as_ref())
}

fn arrow_type_for(ty: LogicalType) -> DataType {
    match ty {
        LogicalType::Integer => DataType::Int64,
        LogicalType::Float => DataType::Float64,
        LogicalType::Boolean => DataType::Boolean,
        // DECIMAL/DATE/TIME/DATETIME/JSON/STRING/NULL are all carried as
        // their textual representation — arrow's Decimal128/temporal types
        // need precision/unit metadata our `Value` doesn't track per-column,
        // and every consumer here (the bridge, the vectorized path's own
        // formatting) round-trips through text anyway.
        _ => DataType::Utf8,
    }
}

fn value_to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

fn value_to_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn value_to_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn value_to_text(v: &Value) -> Option<String> {
    if v.is_null() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Materialize an in-memory column-oriented `RecordBatch` from row-oriented
/// data for formats DataFusion has no native reader for (HTML/Markdown/XML,
/// and any `http(s)://`-wrapped variant thereof).
pub fn rows_to_record_batch(schema: &Schema, rows: &[Row]) -> Result<RecordBatch> {
    let fields: Vec<Field> = schema.iter().map(|(name, ty)| Field::new(name, arrow_type_for(ty), true)).collect();
    let arrow_schema = Arc::new(ArrowSchema::new(fields));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for (name, ty) in schema.iter() {
        let values: Vec<Option<Row>> = Vec::new();
        let _ = values;
        let array: ArrayRef = match arrow_type_for(ty) {
            DataType::Int64 => {
                Arc::new(Int64Array::from(rows.iter().map(|r| r.get(name).and_then(value_to_i64)).collect::<Vec<_>>()))
            }
            DataType::Float64 => Arc::new(Float64Array::from(
                rows.iter().map(|r| r.get(name).and_then(value_to_f64)).collect::<Vec<_>>(),
            )),
            DataType::Boolean => Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.get(name).and_then(value_to_bool)).collect::<Vec<_>>(),
            )),
            _ => Arc::new(StringArray::from(
                rows.iter().map(|r| r.get(name).and_then(value_to_text)).collect::<Vec<_>>(),
            )),
        };
        columns.push(array);
    }

    RecordBatch::try_new(arrow_schema, columns)
        .map_err(|e| TabqlError::TypeError(format!("failed to build Arrow batch: {e}")))
}

/// Register `source_ref` as a DataFusion table named `logical_name`. CSV,
/// Parquet, and JSON-lines use DataFusion's own readers directly; every
/// other format is read via our own reader layer and registered as a
/// `MemTable`, the register-materialized-table fallback for formats
/// DataFusion's own embedded engine can't read natively.
pub async fn register_source(
    ctx: &SessionContext,
    logical_name: &str,
    source_ref: &str,
    config: &EngineConfig,
) -> Result<()> {
    let parsed = parse_fragment(source_ref)?;
    let format = parsed
        .format
        .or_else(|| infer_format_from_extension(&parsed.path))
        .unwrap_or(Format::Csv);

    let is_remote = parsed.path.starts_with("http://") || parsed.path.starts_with("https://");

    match format {
        Format::Csv if !is_remote => {
            ctx.register_csv(logical_name, &parsed.path, CsvReadOptions::new())
                .await
                .map_err(|e| TabqlError::ParseError(format!("registering {source_ref}: {e}")))?;
        }
        Format::Parquet if !is_remote => {
            ctx.register_parquet(logical_name, &parsed.path, ParquetReadOptions::default())
                .await
                .map_err(|e| TabqlError::ParseError(format!("registering {source_ref}: {e}")))?;
        }
        Format::Jsonl if !is_remote => {
            ctx.register_json(logical_name, &parsed.path, NdJsonReadOptions::default())
                .await
                .map_err(|e| TabqlError::ParseError(format!("registering {source_ref}: {e}")))?;
        }
        _ => {
            let mut reader = build_reader(source_ref, config)?;
            let schema = reader.get_schema()?.unwrap_or_default();
            let rows: Vec<Row> = reader.read_lazy()?.collect();
            let batch = rows_to_record_batch(&schema, &rows)?;
            let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch]])
                .map_err(|e| TabqlError::TypeError(format!("building MemTable for {source_ref}: {e}")))?;
            ctx.register_table(logical_name, Arc::new(mem_table))
                .map_err(|e| TabqlError::ParseError(format!("registering {source_ref}: {e}")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_csv_from_extension() {
        assert_eq!(infer_format_from_extension("data.csv"), Some(Format::Csv));
        assert_eq!(infer_format_from_extension("data.parquet"), Some(Format::Parquet));
        assert_eq!(infer_format_from_extension("no_extension"), None);
    }
}
