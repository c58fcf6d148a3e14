//! HTML table extraction via `scraper` (CSS-selector based DOM query) — a
//! fresh dependency pick, noted in DESIGN.md.

use std::fs;

use scraper::{Html, Selector};

use crate::error::{Result, TabqlError};
use crate::eval::conditions_match;
use crate::schema::Schema;
use crate::sql::ast::Condition;
use crate::types::{infer_type_from_string, Row};

use super::Reader;

fn extract_table(document: &Html, index: i64) -> Result<Vec<Row>> {
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("th,td").unwrap();
    let header_sel = Selector::parse("th").unwrap();

    let tables: Vec<_> = document.select(&table_sel).collect();
    if tables.is_empty() {
        return Err(TabqlError::NotFound("no <table> elements found".into()));
    }
    let resolved = if index < 0 { tables.len() as i64 + index } else { index };
    let table = tables.get(resolved.max(-1) as usize).ok_or_else(|| {
        TabqlError::NotFound(format!("table index {index} out of range (found {} tables)", tables.len()))
    })?;

    let mut rows_html: Vec<_> = table.select(&row_sel).collect();
    if rows_html.is_empty() {
        return Ok(Vec::new());
    }

    let header_row = rows_html[0];
    let has_th = header_row.select(&header_sel).next().is_some();
    let header: Vec<String> = if has_th {
        rows_html.remove(0);
        header_row.select(&header_sel).map(|c| c.text().collect::<String>().trim().to_string()).collect()
    } else {
        let width = header_row.select(&cell_sel).count();
        (0..width).map(|i| format!("col_{i}")).collect()
    };

    Ok(rows_from_body(&rows_html, &header, &cell_sel))
}

fn rows_from_body(rows_html: &[scraper::ElementRef], header: &[String], cell_sel: &Selector) -> Vec<Row> {
    let mut out = Vec::new();
    for tr in rows_html {
        let cells: Vec<String> = tr.select(cell_sel).map(|c| c.text().collect::<String>().trim().to_string()).collect();
        if cells.is_empty() {
            continue;
        }
        let mut row = Row::new();
        for (name, cell) in header.iter().zip(cells.iter()) {
            row.insert(name.clone(), infer_type_from_string(cell));
        }
        out.push(row);
    }
    out
}

pub struct HtmlReader {
    path: String,
    table_index: i64,
    sample_size: usize,
    filter: Vec<Condition>,
    columns: Option<Vec<String>>,
    limit: Option<u64>,
}

impl HtmlReader {
    pub fn new(path: impl Into<String>, table_index: i64) -> Self {
        Self { path: path.into(), table_index, sample_size: 100, filter: Vec::new(), columns: None, limit: None }
    }

    fn load_rows(&self) -> Result<Vec<Row>> {
        let text = fs::read_to_string(&self.path).map_err(|e| TabqlError::NotFound(format!("{}: {e}", self.path)))?;
        let document = Html::parse_document(&text);
        extract_table(&document, self.table_index)
    }
}

impl Reader for HtmlReader {
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
    fn extracts_simple_table() {
        let html = "<table><tr><th>name</th><th>age</th></tr><tr><td>Alice</td><td>30</td></tr></table>";
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        file.write_all(html.as_bytes()).unwrap();
        let mut reader = HtmlReader::new(file.path().to_str().unwrap(), 0);
        let rows: Vec<Row> = reader.read_lazy().unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").unwrap().to_string(), "Alice");
    }

    #[test]
    fn out_of_range_table_index_errors() {
        let html = "<table><tr><th>a</th></tr></table>";
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        file.write_all(html.as_bytes()).unwrap();
        let mut reader = HtmlReader::new(file.path().to_str().unwrap(), 5);
        assert!(reader.read_lazy().is_err());
    }
}
