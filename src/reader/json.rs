//! JSON reader: loads the whole document, locates the record list via a path
//! expression, and yields one row per record.

use std::fs;
use std::path::Path;

use serde_json::Value as Json;

use crate::error::{Result, TabqlError};
use crate::eval::conditions_match;
use crate::schema::Schema;
use crate::sql::ast::Condition;
use crate::types::{Row, Value};

use super::Reader;

const AUTO_DETECT_KEYS: &[&str] = &["data", "records", "items", "rows", "results"];

enum Cursor {
    Single(Json),
    Multi(Vec<Json>),
}

/// Navigate `root` by a `.`-separated path with `segment[i]` (index) and
/// `segment[]` (flatten; at most one per path) operators, returning the
/// final record list.
fn navigate(root: Json, path: &str) -> Result<Vec<Json>> {
    let mut cursor = Cursor::Single(root);
    let mut flattened_once = false;

    for raw_segment in path.split('.') {
        if raw_segment.is_empty() {
            continue;
        }
        let (name, bracket) = split_bracket(raw_segment);

        if !name.is_empty() {
            cursor = step_key(cursor, name)?;
        }

        if let Some(bracket_contents) = bracket {
            if bracket_contents.is_empty() {
                if flattened_once {
                    return Err(TabqlError::ParseError(
                        "at most one [] flatten operator is allowed per JSON path".into(),
                    ));
                }
                flattened_once = true;
                cursor = flatten(cursor)?;
            } else {
                let index: usize = bracket_contents
                    .parse()
                    .map_err(|_| TabqlError::ParseError(format!("invalid array index: {bracket_contents}")))?;
                cursor = step_index(cursor, index)?;
            }
        }
    }

    finalize(cursor)
}

fn split_bracket(segment: &str) -> (&str, Option<&str>) {
    if let Some(open) = segment.find('[') {
        if let Some(close) = segment.find(']') {
            if close > open {
                return (&segment[..open], Some(&segment[open + 1..close]));
            }
        }
    }
    (segment, None)
}

fn step_key(cursor: Cursor, key: &str) -> Result<Cursor> {
    match cursor {
        Cursor::Single(v) => {
            let next = v
                .get(key)
                .cloned()
                .ok_or_else(|| TabqlError::NotFound(format!("JSON key not found: {key}")))?;
            Ok(Cursor::Single(next))
        }
        Cursor::Multi(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let next = item
                    .get(key)
                    .cloned()
                    .ok_or_else(|| TabqlError::NotFound(format!("JSON key not found: {key}")))?;
                out.push(next);
            }
            Ok(Cursor::Multi(out))
        }
    }
}

fn step_index(cursor: Cursor, index: usize) -> Result<Cursor> {
    match cursor {
        Cursor::Single(Json::Array(arr)) => {
            let item = arr.get(index).cloned().ok_or_else(|| {
                TabqlError::NotFound(format!("JSON array index out of range: {index}"))
            })?;
            Ok(Cursor::Single(item))
        }
        Cursor::Single(_) => Err(TabqlError::TypeError("cannot index a non-list JSON value".into())),
        Cursor::Multi(_) => Err(TabqlError::ParseError("cannot apply [i] after a [] flatten".into())),
    }
}

fn flatten(cursor: Cursor) -> Result<Cursor> {
    match cursor {
        Cursor::Single(Json::Array(arr)) => Ok(Cursor::Multi(arr)),
        Cursor::Single(_) => Err(TabqlError::TypeError("cannot flatten a non-list JSON value".into())),
        Cursor::Multi(_) => Err(TabqlError::ParseError("at most one [] flatten operator is allowed".into())),
    }
}

fn finalize(cursor: Cursor) -> Result<Vec<Json>> {
    match cursor {
        Cursor::Multi(items) => Ok(items),
        Cursor::Single(Json::Array(arr)) => Ok(arr),
        Cursor::Single(obj @ Json::Object(_)) => Ok(vec![obj]),
        Cursor::Single(_) => Err(TabqlError::TypeError("JSON path did not resolve to a record list".into())),
    }
}

/// Auto-detect the record list when no path/records_key is given: the
/// top-level list; else the first list-valued key among a small set of
/// conventional names; else the first list-valued key at all; else treat a
/// single object as a one-row table.
fn auto_detect(root: &Json) -> Vec<Json> {
    if let Json::Array(arr) = root {
        return arr.clone();
    }
    if let Json::Object(map) = root {
        for key in AUTO_DETECT_KEYS {
            if let Some(Json::Array(arr)) = map.get(*key) {
                return arr.clone();
            }
        }
        for value in map.values() {
            if let Json::Array(arr) = value {
                return arr.clone();
            }
        }
        return vec![root.clone()];
    }
    Vec::new()
}

pub fn json_value_to_value(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(_) | Json::Object(_) => Value::Json(value.to_string()),
    }
}

fn record_to_row(record: &Json) -> Row {
    let mut row = Row::new();
    match record {
        Json::Object(map) => {
            for (k, v) in map {
                row.insert(k.clone(), json_value_to_value(v));
            }
        }
        other => {
            row.insert("value".to_string(), json_value_to_value(other));
        }
    }
    row
}

pub struct JsonReader {
    path: String,
    records_path: Option<String>,
    sample_size: usize,
    filter: Vec<Condition>,
    columns: Option<Vec<String>>,
    limit: Option<u64>,
}

impl JsonReader {
    pub fn new(path: impl Into<String>, records_path: Option<String>) -> Self {
        Self {
            path: path.into(),
            records_path,
            sample_size: 100,
            filter: Vec::new(),
            columns: None,
            limit: None,
        }
    }

    fn load_records(&self) -> Result<Vec<Json>> {
        let text = fs::read_to_string(Path::new(&self.path))
            .map_err(|e| TabqlError::NotFound(format!("{}: {e}", self.path)))?;
        let root: Json = serde_json::from_str(&text)
            .map_err(|e| TabqlError::ParseError(format!("invalid JSON in {}: {e}", self.path)))?;
        match &self.records_path {
            Some(path) => navigate(root, path),
            None => Ok(auto_detect(&root)),
        }
    }
}

impl Reader for JsonReader {
    fn get_schema(&mut self) -> Result<Option<Schema>> {
        let records = self.load_records()?;
        if records.is_empty() {
            return Ok(None);
        }
        let rows: Vec<Row> = records.iter().take(self.sample_size).map(record_to_row).collect();
        Ok(Some(Schema::from_rows(&rows)))
    }

    fn read_lazy(&mut self) -> Result<Box<dyn Iterator<Item = Row> + '_>> {
        let records = self.load_records()?;
        let filter = self.filter.clone();
        let columns = self.columns.clone();
        let limit = self.limit;
        let mut emitted: u64 = 0;

        let rows = records.into_iter().map(move |rec| {
            let mut row = record_to_row(&rec);
            if let Some(wanted) = &columns {
                row.retain(|k, _| wanted.contains(k));
            }
            row
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

    fn write_temp_json(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn auto_detects_top_level_array() {
        let file = write_temp_json(r#"[{"a":1},{"a":2}]"#);
        let mut reader = JsonReader::new(file.path().to_str().unwrap(), None);
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn auto_detects_conventional_records_key() {
        let file = write_temp_json(r#"{"data":[{"a":1}],"meta":{"x":1}}"#);
        let mut reader = JsonReader::new(file.path().to_str().unwrap(), None);
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn single_object_becomes_one_row() {
        let file = write_temp_json(r#"{"a":1,"b":2}"#);
        let mut reader = JsonReader::new(file.path().to_str().unwrap(), None);
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0].get("a"), Some(Value::Integer(1))));
    }

    #[test]
    fn navigates_flatten_path() {
        let file = write_temp_json(r#"{"data":{"items":[{"a":1},{"a":2},{"a":3}]}}"#);
        let mut reader = JsonReader::new(file.path().to_str().unwrap(), Some("data.items[]".to_string()));
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn index_out_of_range_is_error() {
        let root: Json = serde_json::from_str(r#"[1,2]"#).unwrap();
        assert!(navigate(root, "[5]").is_err());
    }
}
