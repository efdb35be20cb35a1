//! Query string rendering for the hosted backend's REST dialect.

use barberbook_core::{
    filter::{Filter, render_condition, render_logic_tree},
    plan::{Action, QueryPlan},
};

/// Query parameters for `plan`. Ordering and limit are only sent for selects;
/// mutations apply them to the returned rows.
#[must_use]
pub fn query_params(plan: &QueryPlan) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), plan.columns.clone())];

    params.extend(plan.filters.iter().map(|filter| filter_param(filter, false)));

    if plan.action == Action::Select {
        if let Some(order) = &plan.order {
            params.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction.keyword()),
            ));
        }

        if let Some(limit) = plan.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
    }

    params
}

/// Parameters that match every row, used before a full table replace.
#[must_use]
pub fn match_all_params() -> Vec<(String, String)> {
    vec![("id".to_string(), "not.is.null".to_string())]
}

fn filter_param(filter: &Filter, negated: bool) -> (String, String) {
    let prefix = if negated { "not." } else { "" };

    match filter {
        Filter::Condition(condition) => {
            let (column, value) = render_condition(condition);
            (column, format!("{prefix}{value}"))
        }
        Filter::Not(inner) => filter_param(inner, !negated),
        Filter::And(children) => (format!("{prefix}and"), render_logic_tree(children)),
        Filter::Or(children) => (format!("{prefix}or"), render_logic_tree(children)),
    }
}

#[cfg(test)]
mod tests {
    use barberbook_core::{
        filter::{Filter, Operator, parse_logic_tree},
        plan::{Direction, OrderBy},
        tables::Table,
    };
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn selects_render_filters_order_and_limit() {
        let mut plan = QueryPlan::new(Table::Services);
        plan.filters.push(Filter::condition("barbershop_id", Operator::Eq, "shop-a"));
        plan.filters.push(Filter::condition("price", Operator::Gte, 20));
        plan.order = Some(OrderBy {
            column: "price".to_string(),
            direction: Direction::Descending,
        });
        plan.limit = Some(1);

        assert_eq!(
            query_params(&plan),
            [
                pair("select", "*"),
                pair("barbershop_id", "eq.shop-a"),
                pair("price", "gte.20"),
                pair("order", "price.desc"),
                pair("limit", "1"),
            ]
        );
    }

    #[test]
    fn negations_and_groups_use_prefixed_keys() -> TestResult {
        let mut plan = QueryPlan::new(Table::Appointments);
        plan.filters.push(Filter::condition("notes", Operator::Is, json!(null)).negate());
        plan.filters.push(Filter::Or(parse_logic_tree("status.eq.cancelled,price.gt.50")?));
        plan.filters.push(Filter::Or(parse_logic_tree("a.eq.1,b.eq.2")?).negate());

        assert_eq!(
            query_params(&plan)[1..],
            [
                pair("notes", "not.is.null"),
                pair("or", "(status.eq.cancelled,price.gt.50)"),
                pair("not.or", "(a.eq.1,b.eq.2)"),
            ]
        );

        Ok(())
    }

    #[test]
    fn mutations_leave_order_and_limit_to_the_client() {
        let mut plan = QueryPlan::new(Table::Clients);
        plan.action = Action::Delete;
        plan.limit = Some(3);

        assert_eq!(query_params(&plan), [pair("select", "*")]);
    }
}
