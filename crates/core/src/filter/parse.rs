//! Parser for the hosted backend's textual logic trees, e.g.
//! `name.ilike.*corte*,and(price.gte.20,price.lte.40),not.notes.is.null`.

use serde_json::{Number, Value};
use smallvec::SmallVec;
use thiserror::Error;

use super::{Filter, Operator};

/// Errors raised while parsing a textual filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    /// Nothing to parse.
    #[error("filter expression is empty")]
    Empty,

    /// Parentheses or quotes do not pair up.
    #[error("unbalanced parentheses or quotes in {0:?}")]
    Unbalanced(String),

    /// An item lacks the operator segment.
    #[error("expected column.operator.value, got {0:?}")]
    MissingOperator(String),

    /// The operator name is not recognized.
    #[error("unknown filter operator {0:?}")]
    UnknownOperator(String),

    /// An `in` operand is not a parenthesised list.
    #[error("expected a parenthesised list, got {0:?}")]
    InvalidList(String),

    /// An `is` operand is not null, true or false.
    #[error("`is` only accepts null, true or false, got {0:?}")]
    InvalidIsValue(String),
}

/// Parse a comma separated list of filters. The list may be wrapped in one
/// pair of parentheses.
///
/// # Errors
///
/// Returns an error when any item is malformed.
pub fn parse_logic_tree(input: &str) -> Result<Vec<Filter>, FilterParseError> {
    let trimmed = input.trim();

    let body = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|inner| split_top_level(inner).is_ok())
        .unwrap_or(trimmed);

    if body.is_empty() {
        return Err(FilterParseError::Empty);
    }

    split_top_level(body)?
        .into_iter()
        .map(parse_item)
        .collect()
}

fn parse_item(item: &str) -> Result<Filter, FilterParseError> {
    let item = item.trim();

    if item.is_empty() {
        return Err(FilterParseError::Empty);
    }

    if let Some(rest) = item.strip_prefix("not.") {
        return parse_item(rest).map(Filter::negate);
    }

    if let Some(inner) = group_body(item, "and(") {
        return parse_logic_tree(inner).map(Filter::And);
    }

    if let Some(inner) = group_body(item, "or(") {
        return parse_logic_tree(inner).map(Filter::Or);
    }

    parse_condition(item)
}

fn group_body<'a>(item: &'a str, opener: &str) -> Option<&'a str> {
    item.strip_prefix(opener)?.strip_suffix(')')
}

fn parse_condition(item: &str) -> Result<Filter, FilterParseError> {
    let (column, rest) = item
        .split_once('.')
        .ok_or_else(|| FilterParseError::MissingOperator(item.to_string()))?;

    let (negated, rest) = match rest.strip_prefix("not.") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let (keyword, raw) = rest
        .split_once('.')
        .ok_or_else(|| FilterParseError::MissingOperator(item.to_string()))?;

    let operator = Operator::from_keyword(keyword)
        .ok_or_else(|| FilterParseError::UnknownOperator(keyword.to_string()))?;

    let value = match operator {
        Operator::In => parse_list(raw)?,
        Operator::Is => match raw {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(FilterParseError::InvalidIsValue(raw.to_string())),
        },
        Operator::Like | Operator::ILike => Value::String(unquote(raw).replace('*', "%")),
        _ => parse_scalar(raw),
    };

    let filter = Filter::condition(column.trim(), operator, value);

    Ok(if negated { filter.negate() } else { filter })
}

fn parse_list(raw: &str) -> Result<Value, FilterParseError> {
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| FilterParseError::InvalidList(raw.to_string()))?;

    if inner.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    Ok(Value::Array(
        split_top_level(inner)?.into_iter().map(parse_scalar).collect(),
    ))
}

/// Interpret an unquoted token: `null`, booleans and numbers become typed
/// values, double-quoted tokens and everything else become strings.
#[must_use]
pub fn parse_scalar(raw: &str) -> Value {
    let raw = raw.trim();

    if is_quoted(raw) {
        return Value::String(unquote(raw));
    }

    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(integer.into());
    }

    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"')
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();

    if !is_quoted(raw) {
        return raw.to_string();
    }

    raw.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(raw)
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

/// Split on commas that are outside parentheses and double quotes.
fn split_top_level(input: &str) -> Result<SmallVec<[&str; 4]>, FilterParseError> {
    let mut parts = SmallVec::new();
    let mut depth = 0_usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| FilterParseError::Unbalanced(input.to_string()))?;
            }
            ',' if !in_quotes && depth == 0 => {
                parts.push(input.get(start..index).unwrap_or_default());
                start = index + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || in_quotes {
        return Err(FilterParseError::Unbalanced(input.to_string()));
    }

    parts.push(input.get(start..).unwrap_or_default());

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_flat_list() -> TestResult {
        let filters = parse_logic_tree("name.eq.Corte,price.gt.20")?;

        assert_eq!(
            filters,
            vec![
                Filter::condition("name", Operator::Eq, "Corte"),
                Filter::condition("price", Operator::Gt, 20),
            ]
        );

        Ok(())
    }

    #[test]
    fn parses_nested_groups_and_negation() -> TestResult {
        let filters =
            parse_logic_tree("(status.eq.confirmed,and(price.gte.20,not.notes.is.null))")?;

        assert_eq!(
            filters,
            vec![
                Filter::condition("status", Operator::Eq, "confirmed"),
                Filter::And(vec![
                    Filter::condition("price", Operator::Gte, 20),
                    Filter::condition("notes", Operator::Is, Value::Null).negate(),
                ]),
            ]
        );

        Ok(())
    }

    #[test]
    fn parses_in_lists_with_quoted_values() -> TestResult {
        let filters = parse_logic_tree(r#"name.in.("Corte, Barba",Sobrancelha,10)"#)?;

        assert_eq!(
            filters,
            vec![Filter::condition(
                "name",
                Operator::In,
                json!(["Corte, Barba", "Sobrancelha", 10])
            )]
        );

        Ok(())
    }

    #[test]
    fn star_is_a_like_wildcard_and_column_negation_works() -> TestResult {
        let filters = parse_logic_tree("name.ilike.*barba*,price.not.eq.25")?;

        assert_eq!(
            filters,
            vec![
                Filter::condition("name", Operator::ILike, "%barba%"),
                Filter::condition("price", Operator::Eq, 25).negate(),
            ]
        );

        Ok(())
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_logic_tree(""), Err(FilterParseError::Empty));
        assert!(matches!(
            parse_logic_tree("price"),
            Err(FilterParseError::MissingOperator(_))
        ));
        assert!(matches!(
            parse_logic_tree("price.between.1"),
            Err(FilterParseError::UnknownOperator(_))
        ));
        assert!(matches!(
            parse_logic_tree("and(price.eq.1"),
            Err(FilterParseError::Unbalanced(_))
        ));
        assert!(matches!(
            parse_logic_tree("notes.is.maybe"),
            Err(FilterParseError::InvalidIsValue(_))
        ));
    }

    #[test]
    fn quoted_scalars_stay_strings() {
        assert_eq!(parse_scalar("\"123\""), json!("123"));
        assert_eq!(parse_scalar("123"), json!(123));
        assert_eq!(parse_scalar("12.5"), json!(12.5));
        assert_eq!(parse_scalar("null"), Value::Null);
    }
}
