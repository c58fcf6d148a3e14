//! Recursive-descent parser for the supported SELECT subset.

use crate::error::{Result, TabqlError};
use crate::types::{infer_type_from_string, Value};

use super::ast::*;

/// Split `sql` into tokens: quoted strings are kept whole (with their
/// quotes), `,()` are always their own token, comparison operators
/// (`=`,`>`,`<`,`>=`,`<=`,`!=`,`<>`) are recognized eagerly even when jammed
/// against neighboring text, everything else is a whitespace-delimited word.
fn tokenize(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i < chars.len() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == ',' || c == '(' || c == ')' {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        if c == '<' || c == '>' || c == '!' || c == '=' {
            if i + 1 < chars.len() {
                let two: String = chars[i..i + 2].iter().collect();
                if matches!(two.as_str(), "<=" | ">=" | "!=" | "<>") {
                    tokens.push(two);
                    i += 2;
                    continue;
                }
            }
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && !"(),<>=!".contains(chars[i]) {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }
    tokens
}

fn strip_quotes(tok: &str) -> Option<&str> {
    if tok.len() >= 2 {
        let bytes = tok.as_bytes();
        if (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
            || (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
        {
            return Some(&tok[1..tok.len() - 1]);
        }
    }
    None
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn peek_at(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset).map(String::as_str)
    }

    fn advance(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn is_kw(tok: &str, kw: &str) -> bool {
        tok.eq_ignore_ascii_case(kw)
    }

    fn peek_is_kw(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| Self::is_kw(t, kw))
    }

    fn expect_kw(&mut self, kw: &str) -> Result<()> {
        match self.advance() {
            Some(tok) if Self::is_kw(&tok, kw) => Ok(()),
            Some(tok) => Err(TabqlError::ParseError(format!("expected {kw}, found {tok}"))),
            None => Err(TabqlError::ParseError(format!("expected {kw}, found end of input"))),
        }
    }

    fn expect_token(&mut self, tok: &str) -> Result<()> {
        match self.advance() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(TabqlError::ParseError(format!("expected '{tok}', found '{t}'"))),
            None => Err(TabqlError::ParseError(format!("expected '{tok}', found end of input"))),
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance() {
            Some(tok) => Ok(strip_quotes(&tok).map(str::to_string).unwrap_or(tok)),
            None => Err(TabqlError::ParseError("expected identifier, found end of input".into())),
        }
    }

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_kw("SELECT")?;
        let (columns, aggregates) = self.parse_columns()?;
        self.expect_kw("FROM")?;
        let source = self.expect_identifier()?;

        let join = self.parse_optional_join()?;

        let where_clause = if self.peek_is_kw("WHERE") {
            self.advance();
            self.parse_conditions()?
        } else {
            Vec::new()
        };

        let group_by = if self.peek_is_kw("GROUP") {
            self.advance();
            self.expect_kw("BY")?;
            self.parse_column_list()?
        } else {
            Vec::new()
        };

        let order_by = if self.peek_is_kw("ORDER") {
            self.advance();
            self.expect_kw("BY")?;
            self.parse_order_items()?
        } else {
            Vec::new()
        };

        let limit = if self.peek_is_kw("LIMIT") {
            self.advance();
            let tok = self.advance().ok_or_else(|| TabqlError::ParseError("expected integer after LIMIT".into()))?;
            let n: i64 = tok
                .parse()
                .map_err(|_| TabqlError::ParseError(format!("invalid LIMIT value: {tok}")))?;
            if n < 0 {
                return Err(TabqlError::ParseError("LIMIT must be non-negative".into()));
            }
            Some(n as u64)
        } else {
            None
        };

        if self.pos != self.tokens.len() {
            return Err(TabqlError::ParseError(format!(
                "unexpected trailing input starting at '{}'",
                self.tokens[self.pos]
            )));
        }

        Ok(SelectStatement { columns, source, join, where_clause, group_by, aggregates, order_by, limit })
    }

    fn parse_columns(&mut self) -> Result<(SelectColumns, Vec<Aggregate>)> {
        if self.peek() == Some("*") {
            self.advance();
            return Ok((SelectColumns::Star, Vec::new()));
        }
        let mut columns = Vec::new();
        let mut aggregates = Vec::new();
        loop {
            if let Some(func) = self.peek().and_then(aggregate_function_name) {
                if self.peek_at(1) == Some("(") {
                    self.advance();
                    self.advance();
                    let column = if self.peek() == Some("*") {
                        self.advance();
                        None
                    } else {
                        Some(self.expect_identifier()?)
                    };
                    self.expect_token(")")?;
                    let alias = if self.peek_is_kw("AS") {
                        self.advance();
                        Some(self.expect_identifier()?)
                    } else {
                        None
                    };
                    aggregates.push(Aggregate { function: func, column, alias });
                    if self.peek() == Some(",") {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            columns.push(self.expect_identifier()?);
            if self.peek() == Some(",") {
                self.advance();
                continue;
            }
            break;
        }
        Ok((SelectColumns::List(columns), aggregates))
    }

    fn parse_optional_join(&mut self) -> Result<Option<JoinClause>> {
        let join_type = if self.peek_is_kw("INNER") {
            self.advance();
            Some(JoinType::Inner)
        } else if self.peek_is_kw("LEFT") {
            self.advance();
            Some(JoinType::Left)
        } else if self.peek_is_kw("RIGHT") {
            self.advance();
            Some(JoinType::Right)
        } else if self.peek_is_kw("JOIN") {
            Some(JoinType::Inner)
        } else {
            None
        };
        let Some(join_type) = join_type else { return Ok(None) };
        self.expect_kw("JOIN")?;
        let right_source = self.expect_identifier()?;
        self.expect_kw("ON")?;
        let left_key = self.expect_identifier()?;
        self.expect_token("=")?;
        let right_key = self.expect_identifier()?;
        Ok(Some(JoinClause { right_source, join_type, left_key, right_key }))
    }

    fn parse_conditions(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = vec![self.parse_condition()?];
        while self.peek_is_kw("AND") {
            self.advance();
            conditions.push(self.parse_condition()?);
        }
        Ok(conditions)
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.expect_identifier()?;
        let op_tok = self.advance().ok_or_else(|| TabqlError::ParseError("expected comparison operator".into()))?;
        let op = match op_tok.as_str() {
            "=" => CompareOp::Eq,
            ">" => CompareOp::Gt,
            "<" => CompareOp::Lt,
            ">=" => CompareOp::Ge,
            "<=" => CompareOp::Le,
            "!=" | "<>" => CompareOp::Ne,
            other => return Err(TabqlError::ParseError(format!("unknown operator '{other}'"))),
        };
        let value_tok = self.advance().ok_or_else(|| TabqlError::ParseError("expected value".into()))?;
        let value = parse_value(&value_tok);
        Ok(Condition { column, op, value })
    }

    fn parse_column_list(&mut self) -> Result<Vec<String>> {
        let mut cols = vec![self.expect_identifier()?];
        while self.peek() == Some(",") {
            self.advance();
            cols.push(self.expect_identifier()?);
        }
        Ok(cols)
    }

    fn parse_order_items(&mut self) -> Result<Vec<OrderItem>> {
        let mut items = vec![self.parse_order_item()?];
        while self.peek() == Some(",") {
            self.advance();
            items.push(self.parse_order_item()?);
        }
        Ok(items)
    }

    fn parse_order_item(&mut self) -> Result<OrderItem> {
        let column = self.expect_identifier()?;
        let direction = if self.peek_is_kw("DESC") {
            self.advance();
            SortDirection::Desc
        } else if self.peek_is_kw("ASC") {
            self.advance();
            SortDirection::Asc
        } else {
            SortDirection::Asc
        };
        Ok(OrderItem { column, direction })
    }
}

fn aggregate_function_name(tok: &str) -> Option<AggregateFunction> {
    match tok.to_ascii_uppercase().as_str() {
        "COUNT" => Some(AggregateFunction::Count),
        "SUM" => Some(AggregateFunction::Sum),
        "AVG" => Some(AggregateFunction::Avg),
        "MIN" => Some(AggregateFunction::Min),
        "MAX" => Some(AggregateFunction::Max),
        _ => None,
    }
}

fn parse_value(tok: &str) -> Value {
    if let Some(inner) = strip_quotes(tok) {
        return Value::Str(inner.to_string());
    }
    infer_type_from_string(tok)
}

/// Parse a full SELECT statement. `<>` is accepted and normalized to `!=`
/// during tokenization/condition-building above.
pub fn parse(sql: &str) -> Result<SelectStatement> {
    let tokens = tokenize(sql);
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_select()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select_where_limit() {
        let stmt = parse("SELECT name FROM data WHERE age > 25 LIMIT 2").unwrap();
        assert!(matches!(stmt.columns, SelectColumns::List(ref v) if v == &["name"]));
        assert_eq!(stmt.source, "data");
        assert_eq!(stmt.where_clause.len(), 1);
        assert_eq!(stmt.where_clause[0].op, CompareOp::Gt);
        assert_eq!(stmt.limit, Some(2));
    }

    #[test]
    fn parses_group_by_aggregate_order_by() {
        let stmt = parse("SELECT region, SUM(amount) AS total FROM s GROUP BY region ORDER BY total DESC").unwrap();
        assert_eq!(stmt.group_by, vec!["region".to_string()]);
        assert_eq!(stmt.aggregates.len(), 1);
        assert_eq!(stmt.aggregates[0].effective_alias(), "total");
        assert_eq!(stmt.order_by[0].direction, SortDirection::Desc);
    }

    #[test]
    fn parses_left_join() {
        let stmt = parse("SELECT name, amount FROM c LEFT JOIN o ON id = customer_id").unwrap();
        let join = stmt.join.unwrap();
        assert_eq!(join.join_type, JoinType::Left);
        assert_eq!(join.left_key, "id");
        assert_eq!(join.right_key, "customer_id");
    }

    #[test]
    fn normalizes_angle_bracket_not_equal() {
        let stmt = parse("SELECT * FROM t WHERE a <> 1").unwrap();
        assert_eq!(stmt.where_clause[0].op, CompareOp::Ne);
    }

    #[test]
    fn star_with_quoted_source() {
        let stmt = parse("SELECT * FROM 'data.csv' WHERE age > 28").unwrap();
        assert!(matches!(stmt.columns, SelectColumns::Star));
        assert_eq!(stmt.source, "data.csv");
    }

    #[test]
    fn rejects_negative_limit() {
        assert!(parse("SELECT * FROM t LIMIT -1").is_err());
    }

    #[test]
    fn count_star_default_alias() {
        let stmt = parse("SELECT COUNT(*) FROM t").unwrap();
        assert_eq!(stmt.aggregates[0].effective_alias(), "count_star");
    }
}
