//! Query Plans
//!
//! A plan is the declarative result of a query-builder chain. It holds no
//! storage state and is consumed by whichever data source executes it.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    filter::{Filter, compare_values},
    records::Record,
    tables::Table,
};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first; nulls last.
    #[default]
    Ascending,
    /// Largest first; nulls first.
    Descending,
}

impl Direction {
    /// Keyword in the hosted backend's `order` parameter.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Ordering key and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort on.
    pub column: String,

    /// Sort direction.
    pub direction: Direction,
}

/// What a plan does once rows are selected.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Action {
    /// Return the rows.
    #[default]
    Select,
    /// Merge the payload into every matched row.
    Update(Record),
    /// Remove every matched row.
    Delete,
}

/// A fully accumulated query or mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Target table.
    pub table: Table,

    /// Requested projection. Informational for the local store.
    pub columns: String,

    /// Filters, combined with AND in the order they were added.
    pub filters: Vec<Filter>,

    /// Optional ordering.
    pub order: Option<OrderBy>,

    /// Optional row limit.
    pub limit: Option<usize>,

    /// Select, update or delete.
    pub action: Action,
}

impl QueryPlan {
    /// A plan selecting every column of `table`.
    #[must_use]
    pub fn new(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            action: Action::Select,
        }
    }

    /// Whether every filter matches `record`.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Apply ordering then limit to a result set.
    pub fn finish(&self, records: &mut Vec<Record>) {
        if let Some(order) = &self.order {
            records.sort_by(|left, right| compare_for_order(left, right, order));
        }

        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
    }
}

fn compare_for_order(left: &Record, right: &Record, order: &OrderBy) -> Ordering {
    let left = left.get(&order.column).filter(|value| !value.is_null());
    let right = right.get(&order.column).filter(|value| !value.is_null());

    let ordering = match (left, right) {
        (None, None) => return Ordering::Equal,
        // Nulls sort after everything ascending and before everything descending.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => compare_present(left, right),
    };

    match order.direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}

fn compare_present(left: &Value, right: &Value) -> Ordering {
    compare_values(left, right).unwrap_or_else(|| type_rank(left).cmp(&type_rank(right)))
}

/// Total order across mixed types so sorting stays deterministic.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::records::records_from_value;

    use super::*;

    fn rows() -> Vec<Record> {
        records_from_value(json!([
            { "id": "a", "price": 25 },
            { "id": "b", "price": null },
            { "id": "c", "price": 40 },
            { "id": "d", "price": 15.5 },
        ]))
        .unwrap_or_default()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn ascending_puts_nulls_last() {
        let mut plan = QueryPlan::new(Table::Services);
        plan.order = Some(OrderBy {
            column: "price".to_string(),
            direction: Direction::Ascending,
        });

        let mut records = rows();
        plan.finish(&mut records);

        assert_eq!(ids(&records), ["d", "a", "c", "b"]);
    }

    #[test]
    fn descending_puts_nulls_first_then_largest() {
        let mut plan = QueryPlan::new(Table::Services);
        plan.order = Some(OrderBy {
            column: "price".to_string(),
            direction: Direction::Descending,
        });
        plan.limit = Some(2);

        let mut records = rows();
        plan.finish(&mut records);

        assert_eq!(ids(&records), ["b", "c"]);
    }
}
