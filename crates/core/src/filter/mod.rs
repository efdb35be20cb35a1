//! Filter Expressions
//!
//! Filters form a small boolean tree of column conditions. A query's filter
//! list is an implicit `And`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::records::Record;

mod parse;
mod pattern;
mod render;

pub use parse::{FilterParseError, parse_logic_tree, parse_scalar};
pub use pattern::like_matches;
pub use render::{render_condition, render_filter, render_logic_tree};

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Case-sensitive `%` pattern.
    Like,
    /// Case-insensitive `%` pattern.
    ILike,
    /// Membership in a list.
    In,
    /// Identity check against `null`, `true` or `false`.
    Is,
}

impl Operator {
    /// Operator keyword in the hosted backend's filter syntax.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::In => "in",
            Self::Is => "is",
        }
    }

    /// Parse an operator keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "like" => Self::Like,
            "ilike" => Self::ILike,
            "in" => Self::In,
            "is" => Self::Is,
            _ => return None,
        })
    }
}

/// A single column comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column the comparison reads.
    pub column: String,

    /// Comparison kind.
    pub operator: Operator,

    /// Right-hand operand. For [`Operator::In`] this is an array.
    pub value: Value,
}

impl Condition {
    /// Build a condition.
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate against a record. Missing columns read as `null`.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let field = record.get(&self.column).unwrap_or(&Value::Null);

        match self.operator {
            Operator::Eq => values_equal(field, &self.value),
            Operator::Neq => !values_equal(field, &self.value),
            Operator::Gt => compare_values(field, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare_values(field, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Like | Operator::ILike => match (field, &self.value) {
                (Value::String(text), Value::String(pattern)) => {
                    like_matches(pattern, text, self.operator == Operator::ILike)
                }
                _ => false,
            },
            Operator::In => match &self.value {
                Value::Array(candidates) => candidates
                    .iter()
                    .any(|candidate| values_equal(field, candidate)),
                _ => false,
            },
            Operator::Is => match &self.value {
                Value::Null => field.is_null(),
                Value::Bool(expected) => field.as_bool() == Some(*expected),
                _ => false,
            },
        }
    }
}

/// Boolean filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A single comparison.
    Condition(Condition),
    /// Every child must match. An empty `And` matches everything.
    And(Vec<Filter>),
    /// At least one child must match. An empty `Or` matches nothing.
    Or(Vec<Filter>),
    /// The child must not match.
    Not(Box<Filter>),
}

impl Filter {
    /// A leaf condition.
    pub fn condition(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Condition(Condition::new(column, operator, value))
    }

    /// Negate this filter.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate recursively.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Condition(condition) => condition.matches(record),
            Self::And(children) => children.iter().all(|child| child.matches(record)),
            Self::Or(children) => children.iter().any(|child| child.matches(record)),
            Self::Not(child) => !child.matches(record),
        }
    }
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

/// Strict equality, except that numbers compare by exact value (`25 == 25.0`).
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
                return left == right;
            }

            #[expect(clippy::float_cmp, reason = "equality filters are exact")]
            let equal = match (left.as_f64(), right.as_f64()) {
                (Some(left), Some(right)) => left == right,
                _ => left == right,
            };

            equal
        }
        _ => left == right,
    }
}

/// Natural ordering of two raw values: numeric when both are numbers,
/// lexicographic when both are strings, otherwise incomparable.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}
