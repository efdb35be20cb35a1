//! Render filters back into the hosted backend's textual syntax.

use serde_json::Value;

use super::{Condition, Filter, parse_scalar};

const RESERVED: [char; 5] = [',', '(', ')', '"', '.'];

/// Render a top-level condition as a `(column, "op.value")` query pair.
#[must_use]
pub fn render_condition(condition: &Condition) -> (String, String) {
    (
        condition.column.clone(),
        format!(
            "{}.{}",
            condition.operator.keyword(),
            render_value(&condition.value, false)
        ),
    )
}

/// Render a list of filters as a parenthesised logic tree: `(a.eq.1,b.gt.2)`.
#[must_use]
pub fn render_logic_tree(filters: &[Filter]) -> String {
    let items: Vec<String> = filters.iter().map(render_filter).collect();

    format!("({})", items.join(","))
}

/// Render one filter as a logic tree item.
#[must_use]
pub fn render_filter(filter: &Filter) -> String {
    match filter {
        Filter::Condition(condition) => format!(
            "{}.{}.{}",
            condition.column,
            condition.operator.keyword(),
            render_value(&condition.value, true)
        ),
        Filter::Not(inner) => match inner.as_ref() {
            Filter::Condition(condition) => format!(
                "{}.not.{}.{}",
                condition.column,
                condition.operator.keyword(),
                render_value(&condition.value, true)
            ),
            other => format!("not.{}", render_filter(other)),
        },
        Filter::And(children) => format!("and{}", render_logic_tree(children)),
        Filter::Or(children) => format!("or{}", render_logic_tree(children)),
    }
}

fn render_value(value: &Value, quote_reserved: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) if quote_reserved && needs_quotes(text) => quote(text),
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(|item| render_value(item, true)).collect();

            format!("({})", rendered.join(","))
        }
        Value::Object(_) => quote(&value.to_string()),
    }
}

/// Strings that contain syntax characters or would read back as another type.
fn needs_quotes(text: &str) -> bool {
    text.is_empty() || text.contains(RESERVED) || !parse_scalar(text).is_string()
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::filter::{Operator, parse_logic_tree};

    use super::*;

    #[test]
    fn top_level_conditions_render_as_query_pairs() {
        let condition = Condition::new("name", Operator::Eq, "Corte, Barba");

        assert_eq!(
            render_condition(&condition),
            ("name".to_string(), "eq.Corte, Barba".to_string())
        );
    }

    #[test]
    fn logic_trees_quote_reserved_characters() {
        let tree = render_logic_tree(&[
            Filter::condition("name", Operator::In, json!(["Corte, Barba", "Barba"])),
            Filter::condition("notes", Operator::Is, Value::Null).negate(),
        ]);

        assert_eq!(tree, r#"(name.in.("Corte, Barba",Barba),notes.not.is.null)"#);
    }

    #[test]
    fn rendered_trees_parse_back() -> TestResult {
        let filters = vec![
            Filter::condition("status", Operator::Eq, "confirmed"),
            Filter::Or(vec![
                Filter::condition("price", Operator::Gte, 20),
                Filter::condition("name", Operator::ILike, "%barba%"),
            ]),
            Filter::And(vec![Filter::condition("active", Operator::Is, true)]).negate(),
        ];

        assert_eq!(parse_logic_tree(&render_logic_tree(&filters))?, filters);

        Ok(())
    }
}
