//! Parses the `source#format:selector` extension grammar used to override a
//! reader's format and table selector.

use crate::error::{Result, TabqlError};

/// Reader format, as named by a fragment or inferred from an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Parquet,
    Json,
    Jsonl,
    Html,
    Markdown,
    Xml,
}

impl Format {
    pub fn parse(name: &str) -> Option<Format> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(Format::Csv),
            "parquet" => Some(Format::Parquet),
            "json" => Some(Format::Json),
            "jsonl" | "ndjson" => Some(Format::Jsonl),
            "html" | "htm" => Some(Format::Html),
            "markdown" | "md" => Some(Format::Markdown),
            "xml" => Some(Format::Xml),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Format> {
        Format::parse(ext)
    }
}

/// A selector is either a numeric table/row-group index (possibly negative)
/// or a string path (JSON path expression, XML element path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Index(i64),
    Path(String),
}

/// The result of parsing a source reference's fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFragment {
    pub path: String,
    pub format: Option<Format>,
    pub selector: Option<Selector>,
}

/// Parse `source[#[format][:selector]]`.
///
/// An empty fragment (`path#`) is equivalent to no fragment at all. A bare
/// `#format` sets format only. `#:selector` sets selector only. An unknown
/// format name is an error.
pub fn parse_fragment(source: &str) -> Result<ParsedFragment> {
    let Some((path, fragment)) = source.split_once('#') else {
        return Ok(ParsedFragment { path: source.to_string(), format: None, selector: None });
    };

    if fragment.is_empty() {
        return Ok(ParsedFragment { path: path.to_string(), format: None, selector: None });
    }

    let (format_part, selector_part) = match fragment.split_once(':') {
        Some((f, s)) => (f, Some(s)),
        None => (fragment, None),
    };

    let format = if format_part.is_empty() {
        None
    } else {
        Some(Format::parse(format_part).ok_or_else(|| {
            TabqlError::ParseError(format!("unknown fragment format: {format_part}"))
        })?)
    };

    let selector = selector_part.map(|s| match s.parse::<i64>() {
        Ok(n) => Selector::Index(n),
        Err(_) => Selector::Path(s.to_string()),
    });

    Ok(ParsedFragment { path: path.to_string(), format, selector })
}

/// Reverse helper: rebuild a decorated source reference from its parts.
pub fn build_source_fragment(path: &str, format: Option<Format>, selector: Option<&Selector>) -> String {
    if format.is_none() && selector.is_none() {
        return path.to_string();
    }
    let format_str = format.map(format_name).unwrap_or_default();
    let mut out = format!("{path}#{format_str}");
    if let Some(sel) = selector {
        let sel_str = match sel {
            Selector::Index(n) => n.to_string(),
            Selector::Path(p) => p.clone(),
        };
        out.push(':');
        out.push_str(&sel_str);
    }
    out
}

fn format_name(format: Format) -> &'static str {
    match format {
        Format::Csv => "csv",
        Format::Parquet => "parquet",
        Format::Json => "json",
        Format::Jsonl => "jsonl",
        Format::Html => "html",
        Format::Markdown => "markdown",
        Format::Xml => "xml",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fragment() {
        let p = parse_fragment("data.csv").unwrap();
        assert_eq!(p.path, "data.csv");
        assert!(p.format.is_none());
        assert!(p.selector.is_none());
    }

    #[test]
    fn empty_fragment_equivalent_to_none() {
        let p = parse_fragment("data.csv#").unwrap();
        assert_eq!(p.path, "data.csv");
        assert!(p.format.is_none());
    }

    #[test]
    fn bare_format_only() {
        let p = parse_fragment("data.bin#parquet").unwrap();
        assert_eq!(p.format, Some(Format::Parquet));
        assert!(p.selector.is_none());
    }

    #[test]
    fn selector_only() {
        let p = parse_fragment("page.html#:2").unwrap();
        assert!(p.format.is_none());
        assert_eq!(p.selector, Some(Selector::Index(2)));
    }

    #[test]
    fn format_and_negative_index_selector() {
        let p = parse_fragment("page.html#html:-1").unwrap();
        assert_eq!(p.format, Some(Format::Html));
        assert_eq!(p.selector, Some(Selector::Index(-1)));
    }

    #[test]
    fn format_and_path_selector() {
        let p = parse_fragment("data.json#json:data.items[]").unwrap();
        assert_eq!(p.format, Some(Format::Json));
        assert_eq!(p.selector, Some(Selector::Path("data.items[]".to_string())));
    }

    #[test]
    fn unknown_format_is_error() {
        assert!(parse_fragment("data.bin#frobnicate").is_err());
    }

    #[test]
    fn roundtrip_build() {
        let rebuilt = build_source_fragment("page.html", Some(Format::Html), Some(&Selector::Index(-1)));
        assert_eq!(rebuilt, "page.html#html:-1");
    }
}
