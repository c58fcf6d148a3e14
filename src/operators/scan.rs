//! Leaf operator: yields `reader.read_lazy()` directly. Borrows the reader
//! for the duration of iteration rather than owning it — the executor owns
//! the reader and keeps it alive alongside the plan.

use crate::error::Result;
use crate::reader::Reader;
use crate::types::Row;

pub struct ScanOp<'a> {
    inner: Box<dyn Iterator<Item = Row> + 'a>,
}

impl<'a> ScanOp<'a> {
    pub fn new(reader: &'a mut dyn Reader) -> Result<Self> {
        Ok(Self { inner: reader.read_lazy()? })
    }
}

impl<'a> Iterator for ScanOp<'a> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::csv::CsvReader;
    use std::io::Write;

    #[test]
    fn scan_yields_reader_rows_in_order() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"a\n1\n2\n").unwrap();
        let mut reader = CsvReader::new(file.path().to_str().unwrap()).unwrap();
        let scan = ScanOp::new(&mut reader).unwrap();
        let rows: Vec<Row> = scan.collect();
        assert_eq!(rows.len(), 2);
    }
}
