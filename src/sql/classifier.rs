//! Decides whether a query is in-subset (internal parser/executors) or must
//! be delegated to the external fallback bridge.
//!
//! Deliberately simple and keyword-based, matching the original's
//! `_can_parse_with_custom_parser` classifier exactly, down to the
//! string-literal blind spot: a query mentioning `CASE` anywhere — including
//! inside a quoted string — is routed to the external path. Do not "fix"
//! this with string-aware scanning; it is the documented contract.
const ADVANCED_KEYWORDS: &[&str] = &[
    "WITH",
    "OVER",
    "PARTITION BY",
    "WINDOW",
    "HAVING",
    "UNION",
    "INTERSECT",
    "EXCEPT",
    "CASE",
    "CAST",
    "EXTRACT",
    "ROW_NUMBER",
    "RANK",
    "DENSE_RANK",
    "LAG",
    "LEAD",
    "NTILE",
];

/// True iff `sql` can be handled by the internal parser/executors.
pub fn is_in_subset(sql: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    if ADVANCED_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        return false;
    }
    if has_parenthesized_select(&upper) {
        return false;
    }
    true
}

/// Best-effort subquery heuristic: a `SELECT` token appearing after an open
/// paren anywhere in the (uppercased) text.
fn has_parenthesized_select(upper: &str) -> bool {
    let mut depth: i32 = 0;
    let bytes = upper.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                depth += 1;
                let rest = &upper[i + 1..];
                let rest_trimmed = rest.trim_start();
                if rest_trimmed.starts_with("SELECT") {
                    return true;
                }
            }
            b')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    let _ = depth;
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_is_in_subset() {
        assert!(is_in_subset("SELECT name FROM data WHERE age > 25 LIMIT 2"));
    }

    #[test]
    fn with_cte_is_out_of_subset() {
        assert!(!is_in_subset("WITH t AS (SELECT 1) SELECT * FROM t"));
    }

    #[test]
    fn having_is_out_of_subset() {
        assert!(!is_in_subset("SELECT a, COUNT(*) FROM t GROUP BY a HAVING COUNT(*) > 1"));
    }

    #[test]
    fn subquery_heuristic_catches_parenthesized_select() {
        assert!(!is_in_subset("SELECT * FROM t WHERE a IN (SELECT b FROM u)"));
    }

    #[test]
    fn case_keyword_in_string_literal_still_routes_external() {
        assert!(!is_in_subset("SELECT * FROM t WHERE name = 'CASE sensitive'"));
    }
}
