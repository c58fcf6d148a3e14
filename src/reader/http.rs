//! HTTP-backed reader: downloads (or reuses a cached copy of) a remote
//! source, then delegates to the appropriate format-specific reader over the
//! local cache file.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TabqlError};
use crate::fragment::{Format, Selector};
use crate::schema::{Schema, TableStatistics};
use crate::sql::ast::Condition;
use crate::types::Row;

use super::csv::CsvReader;
use super::html::HtmlReader;
use super::json::JsonReader;
use super::jsonl::JsonlReader;
use super::markdown::MarkdownReader;
use super::xml::XmlReader;
use super::Reader;

fn cache_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

fn build_delegate(cache_path: &Path, format: Format, selector: Option<&Selector>) -> Box<dyn Reader> {
    let path = cache_path.to_string_lossy().to_string();
    match format {
        Format::Csv => Box::new(CsvReader::new(path).expect("local cache path never triggers the s3:// guard")),
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
                Some(Selector::Index(_)) | None => None,
            };
            Box::new(XmlReader::new(path, element_path))
        }
        Format::Parquet => Box::new(super::parquet::ParquetReader::new(path)),
    }
}

pub struct HttpReader {
    url: String,
    cache_dir: PathBuf,
    timeout: Duration,
    force_download: bool,
    format: Format,
    selector: Option<Selector>,
    delegate: Option<Box<dyn Reader>>,
}

impl HttpReader {
    pub fn new(
        url: impl Into<String>,
        format: Format,
        selector: Option<Selector>,
        cache_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self { url: url.into(), cache_dir, timeout, force_download: false, format, selector, delegate: None }
    }

    pub fn force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    fn cache_path(&self) -> PathBuf {
        let ext = extension_for(self.format);
        self.cache_dir.join(format!("{}.{ext}", cache_key(&self.url)))
    }

    /// Download (unless a cached copy already exists and `force_download` is
    /// false) via chunked streaming to a `.tmp` file, then atomically rename
    /// into place.
    fn ensure_cached(&self) -> Result<PathBuf> {
        let dest = self.cache_path();
        if dest.exists() && !self.force_download {
            debug!(url = %self.url, path = %dest.display(), "HTTP cache hit");
            return Ok(dest);
        }

        fs::create_dir_all(&self.cache_dir)?;
        let tmp_path = dest.with_extension("tmp");

        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;
        let mut response = client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(TabqlError::IoError(std::io::Error::other(format!(
                "HTTP {} fetching {}",
                response.status(),
                self.url
            ))));
        }

        let mut tmp_file = fs::File::create(&tmp_path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            use std::io::Read as _;
            let n = response.read(&mut buf).map_err(TabqlError::IoError)?;
            if n == 0 {
                break;
            }
            tmp_file.write_all(&buf[..n])?;
        }
        drop(tmp_file);
        fs::rename(&tmp_path, &dest)?;
        info!(url = %self.url, path = %dest.display(), "downloaded and cached HTTP source");
        Ok(dest)
    }

    fn delegate_mut(&mut self) -> Result<&mut Box<dyn Reader>> {
        if self.delegate.is_none() {
            let path = self.ensure_cached()?;
            self.delegate = Some(build_delegate(&path, self.format, self.selector.as_ref()));
        }
        Ok(self.delegate.as_mut().unwrap())
    }

    pub fn clear_cache(&self) -> Result<()> {
        let path = self.cache_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn extension_for(format: Format) -> &'static str {
    match format {
        Format::Csv => "csv",
        Format::Parquet => "parquet",
        Format::Json => "json",
        Format::Jsonl => "jsonl",
        Format::Html => "html",
        Format::Markdown => "md",
        Format::Xml => "xml",
    }
}

impl Reader for HttpReader {
    fn get_schema(&mut self) -> Result<Option<Schema>> {
        self.delegate_mut()?.get_schema()
    }

    fn read_lazy(&mut self) -> Result<Box<dyn Iterator<Item = Row> + '_>> {
        self.delegate_mut()?.read_lazy()
    }

    fn supports_pushdown(&self) -> bool {
        self.delegate.as_ref().map(|d| d.supports_pushdown()).unwrap_or(true)
    }

    fn supports_column_selection(&self) -> bool {
        self.delegate.as_ref().map(|d| d.supports_column_selection()).unwrap_or(true)
    }

    fn supports_limit(&self) -> bool {
        self.delegate.as_ref().map(|d| d.supports_limit()).unwrap_or(true)
    }

    fn supports_partition_pruning(&self) -> bool {
        self.delegate.as_ref().map(|d| d.supports_partition_pruning()).unwrap_or(false)
    }

    fn set_filter(&mut self, conditions: Vec<Condition>) {
        if let Ok(d) = self.delegate_mut() {
            d.set_filter(conditions);
        }
    }

    fn set_columns(&mut self, columns: Vec<String>) {
        if let Ok(d) = self.delegate_mut() {
            d.set_columns(columns);
        }
    }

    fn set_limit(&mut self, limit: u64) {
        if let Ok(d) = self.delegate_mut() {
            d.set_limit(limit);
        }
    }

    fn set_partition_filters(&mut self, conditions: Vec<Condition>) {
        if let Ok(d) = self.delegate_mut() {
            d.set_partition_filters(conditions);
        }
    }

    fn partition_columns(&self) -> Vec<String> {
        self.delegate.as_ref().map(|d| d.partition_columns()).unwrap_or_default()
    }

    fn get_statistics(&self) -> Option<TableStatistics> {
        self.delegate.as_ref().and_then(|d| d.get_statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_md5_hex() {
        let a = cache_key("http://example.com/data.csv");
        let b = cache_key("http://example.com/data.csv");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn cache_path_uses_format_extension() {
        let reader = HttpReader::new(
            "http://example.com/data.parquet",
            Format::Parquet,
            None,
            std::env::temp_dir(),
            Duration::from_secs(5),
        );
        assert!(reader.cache_path().extension().unwrap() == "parquet");
    }
}
