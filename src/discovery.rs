//! Extracts table references from raw SQL text and assigns each a sanitized
//! logical name, for the external fallback bridge and for sourceless queries.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::fragment::parse_fragment;

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:FROM|JOIN)\s+(['"])((?:(?!\1).)+?)\1"#).unwrap()
    })
}

fn bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:FROM|JOIN)\s+([/\w.#:-]+?)(?:\s+(?:ON|WHERE|GROUP|ORDER|LIMIT|INNER|LEFT|RIGHT|JOIN)\b|\s*,|\s*\)|$)",
        )
        .unwrap()
    })
}

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "JOIN", "WHERE", "GROUP", "ORDER", "LIMIT", "INNER", "LEFT", "RIGHT", "ON",
    "AS", "AND", "OR", "BY",
];

/// Does this bare capture look like a path (as opposed to a keyword or a
/// column/table alias with no path-like characters)?
fn looks_like_path(token: &str) -> bool {
    if SQL_KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(token)) {
        return false;
    }
    token.contains('/') || token.contains('.') || token.contains('#')
}

/// Derive a sanitized logical table name for a discovered reference:
/// basename without extension, non-alphanumeric replaced by `_`; if the
/// fragment carries a non-default selector, append it; de-duplicate via an
/// incrementing counter.
fn sanitize_logical_name(reference: &str, used: &IndexMap<String, String>) -> String {
    let parsed = parse_fragment(reference).unwrap_or(crate::fragment::ParsedFragment {
        path: reference.to_string(),
        format: None,
        selector: None,
    });
    let base = parsed
        .path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&parsed.path);
    let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        name = "t".to_string();
    }
    if let Some(crate::fragment::Selector::Index(i)) = parsed.selector {
        if i != 0 {
            name = format!("{name}_{i}");
        }
    }
    if let Some(crate::fragment::Selector::Path(ref p)) = parsed.selector {
        let suffix: String = p.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
        name = format!("{name}_{suffix}");
    }

    if !used.contains_key(&name) {
        return name;
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{name}_{counter}");
        if !used.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Extract every table reference from raw SQL, producing an insertion-ordered
/// `logical name → original reference string` mapping.
pub fn discover_sources(sql: &str) -> IndexMap<String, String> {
    let mut found: IndexMap<String, String> = IndexMap::new();
    let mut seen_refs: std::collections::HashSet<String> = std::collections::HashSet::new();

    for caps in quoted_re().captures_iter(sql) {
        let reference = caps.get(2).unwrap().as_str().to_string();
        if seen_refs.insert(reference.clone()) {
            let name = sanitize_logical_name(&reference, &found);
            found.insert(name, reference);
        }
    }

    for caps in bare_re().captures_iter(sql) {
        let token = caps.get(1).unwrap().as_str();
        if !looks_like_path(token) {
            continue;
        }
        let reference = token.to_string();
        if seen_refs.insert(reference.clone()) {
            let name = sanitize_logical_name(&reference, &found);
            found.insert(name, reference);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_quoted_path() {
        let found = discover_sources("SELECT * FROM 'data.csv' WHERE age > 28");
        assert_eq!(found.get("data").map(String::as_str), Some("data.csv"));
    }

    #[test]
    fn discovers_bare_path() {
        let found = discover_sources("SELECT * FROM data/sales.csv WHERE region = 'E'");
        assert_eq!(found.get("sales").map(String::as_str), Some("data/sales.csv"));
    }

    #[test]
    fn discovers_join_sources_with_dedup_counter() {
        let found = discover_sources("SELECT * FROM 'a/x.csv' JOIN 'b/x.csv' ON a.id = b.id");
        assert_eq!(found.len(), 2);
        assert!(found.contains_key("x"));
        assert!(found.contains_key("x_2"));
    }

    #[test]
    fn ignores_keyword_like_bare_tokens() {
        let found = discover_sources("SELECT a FROM t WHERE a = 1");
        assert!(found.is_empty() || !found.values().any(|v| v == "WHERE"));
    }
}
