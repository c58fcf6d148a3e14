//! GFM-style Markdown table scanner: a small, fully specified state machine,
//! no crate needed.

use std::fs;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, TabqlError};
use crate::eval::conditions_match;
use crate::schema::Schema;
use crate::sql::ast::Condition;
use crate::types::{infer_type_from_string, Row, Value};

use super::Reader;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\|?(\s*:?-+:?\s*\|)+\s*:?-*:?\s*\|?$").unwrap())
}

/// Split a pipe-delimited row into trimmed cells, honoring `\|` as an
/// escaped literal pipe rather than a delimiter.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'|') {
            current.push('|');
            chars.next();
        } else if c == '|' {
            cells.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn cell_to_value(cell: &str) -> Value {
    match cell.to_ascii_lowercase().as_str() {
        "null" | "none" | "n/a" | "-" | "" => Value::Null,
        _ => infer_type_from_string(cell),
    }
}

/// Scan the whole document for GFM table blocks: a header row, a separator
/// row, then data rows until a blank or non-`|` line.
fn scan_tables(text: &str) -> Vec<Vec<Row>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tables = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim_start().starts_with('|') && i + 1 < lines.len() && separator_re().is_match(lines[i + 1].trim()) {
            let header = split_row(lines[i]);
            let mut j = i + 2;
            let mut rows = Vec::new();
            while j < lines.len() {
                let line = lines[j];
                if line.trim().is_empty() || !line.trim_start().starts_with('|') {
                    break;
                }
                let cells = split_row(line);
                let mut row = Row::new();
                for (name, cell) in header.iter().zip(cells.iter()) {
                    row.insert(name.clone(), cell_to_value(cell));
                }
                rows.push(row);
                j += 1;
            }
            tables.push(rows);
            i = j;
        } else {
            i += 1;
        }
    }
    tables
}

pub struct MarkdownReader {
    path: String,
    table_index: i64,
    sample_size: usize,
    filter: Vec<Condition>,
    columns: Option<Vec<String>>,
    limit: Option<u64>,
}

impl MarkdownReader {
    pub fn new(path: impl Into<String>, table_index: i64) -> Self {
        Self { path: path.into(), table_index, sample_size: 100, filter: Vec::new(), columns: None, limit: None }
    }

    fn load_rows(&self) -> Result<Vec<Row>> {
        let text = fs::read_to_string(&self.path).map_err(|e| TabqlError::NotFound(format!("{}: {e}", self.path)))?;
        let tables = scan_tables(&text);
        if tables.is_empty() {
            return Err(TabqlError::NotFound("no Markdown tables found".into()));
        }
        let index = self.table_index;
        let resolved = if index < 0 { tables.len() as i64 + index } else { index };
        tables
            .into_iter()
            .nth(resolved.max(-1) as usize)
            .ok_or_else(|| TabqlError::NotFound(format!("table index {index} out of range")))
    }
}

impl Reader for MarkdownReader {
    fn get_schema(&mut self) -> Result<Option<Schema>> {
        let rows = self.load_rows()?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Schema::from_rows(rows.iter().take(self.sample_size))))
    }

    fn read_lazy(&mut self) -> Result<Box<dyn Iterator<Item = Row> + '_>> {
        let rows = self.load_rows()?;
        let filter = self.filter.clone();
        let columns = self.columns.clone();
        let limit = self.limit;
        let mut emitted: u64 = 0;

        let rows = rows.into_iter().map(move |mut row| {
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

    #[test]
    fn parses_gfm_table() {
        let md = "# Title\n\n| name | age |\n|------|----:|\n| Alice | 30 |\n| Bob | n/a |\n";
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(md.as_bytes()).unwrap();
        let mut reader = MarkdownReader::new(file.path().to_str().unwrap(), 0);
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0].get("age"), Some(Value::Integer(30))));
        assert!(matches!(rows[1].get("age"), Some(Value::Null)));
    }
}
