//! JSON-lines reader: one record per line; malformed lines are diagnosed and
//! skipped rather than aborting the scan.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{Result, TabqlError};
use crate::eval::conditions_match;
use crate::schema::Schema;
use crate::sql::ast::Condition;
use crate::types::Row;

use super::json::json_value_to_value;
use super::Reader;

pub struct JsonlReader {
    path: String,
    sample_size: usize,
    filter: Vec<Condition>,
    columns: Option<Vec<String>>,
    limit: Option<u64>,
}

impl JsonlReader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), sample_size: 100, filter: Vec::new(), columns: None, limit: None }
    }

    fn load_lines(&self) -> Result<Vec<String>> {
        let text = fs::read_to_string(Path::new(&self.path))
            .map_err(|e| TabqlError::NotFound(format!("{}: {e}", self.path)))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn parse_line(line: &str) -> Option<Row> {
        if line.trim().is_empty() {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let mut row = Row::new();
        if let serde_json::Value::Object(map) = value {
            for (k, v) in map {
                row.insert(k, json_value_to_value(&v));
            }
        } else {
            row.insert("value".to_string(), json_value_to_value(&value));
        }
        Some(row)
    }
}

impl Reader for JsonlReader {
    fn get_schema(&mut self) -> Result<Option<Schema>> {
        let lines = self.load_lines()?;
        let rows: Vec<Row> = lines.iter().take(self.sample_size).filter_map(|l| Self::parse_line(l)).collect();
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Schema::from_rows(&rows)))
    }

    fn read_lazy(&mut self) -> Result<Box<dyn Iterator<Item = Row> + '_>> {
        let lines = self.load_lines()?;
        let path = self.path.clone();
        let filter = self.filter.clone();
        let columns = self.columns.clone();
        let limit = self.limit;
        let mut emitted: u64 = 0;

        let rows = lines.into_iter().enumerate().filter_map(move |(lineno, line)| {
            if line.trim().is_empty() {
                return None;
            }
            match Self::parse_line(&line) {
                Some(mut row) => {
                    if let Some(wanted) = &columns {
                        row.retain(|k, _| wanted.contains(k));
                    }
                    Some(row)
                }
                None => {
                    warn!(path = %path, line = lineno + 1, "skipping malformed JSON-lines record");
                    None
                }
            }
        });

        let filtered = rows.filter(move |row| conditions_match(row, &filter));

        let limited = filtered.take_while(move |_| {
            if let Some(limit) = limit {
                if emitted >= limit {
                    return false;
                }
            }
            emitted += 1;
            true
        });

        Ok(Box::new(limited))
    }

    fn supports_pushdown(&self) -> bool {
        true
    }

    fn supports_column_selection(&self) -> bool {
        true
    }

    fn supports_limit(&self) -> bool {
        true
    }

    fn set_filter(&mut self, conditions: Vec<Condition>) {
        self.filter = conditions;
    }

    fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = Some(columns);
    }

    fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_valid_lines_and_skips_malformed() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"a":1}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, r#"{{"a":2}}"#).unwrap();
        let mut reader = JsonlReader::new(file.path().to_str().unwrap());
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 2);
    }
}
