//! Query Builder
//!
//! A fluent, chainable builder that accumulates a [`QueryPlan`] and hands it
//! to a [`DataSource`] when awaited. Chain methods never fail; a malformed
//! argument is remembered and reported by the terminal call.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
};

use barberbook_core::{
    filter::{Filter, Operator, parse_logic_tree},
    plan::{Action, Direction, OrderBy, QueryPlan},
    records::{Record, records_from_value},
    tables::Table,
};
use serde_json::Value;

use crate::{datasource::DataSource, errors::DataError};

/// Builder for one query or mutation against a table.
pub struct QueryBuilder {
    source: Arc<dyn DataSource>,
    plan: QueryPlan,
    error: Option<DataError>,
}

impl Debug for QueryBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("QueryBuilder")
            .field("plan", &self.plan)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl QueryBuilder {
    /// Start a select of every column of `table`.
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, table: Table) -> Self {
        Self {
            source,
            plan: QueryPlan::new(table),
            error: None,
        }
    }

    /// The plan accumulated so far.
    #[must_use]
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Set the column projection.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.plan.columns = columns.to_string();
        self
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Eq, value)
    }

    /// `column <> value`.
    #[must_use]
    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Neq, value)
    }

    /// `column > value`.
    #[must_use]
    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Gt, value)
    }

    /// `column >= value`.
    #[must_use]
    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Gte, value)
    }

    /// `column < value`.
    #[must_use]
    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Lt, value)
    }

    /// `column <= value`.
    #[must_use]
    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Lte, value)
    }

    /// Case-sensitive pattern match; `%` matches any run of characters.
    #[must_use]
    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.condition(column, Operator::Like, pattern)
    }

    /// Case-insensitive [`like`](Self::like).
    #[must_use]
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.condition(column, Operator::ILike, pattern)
    }

    /// `column` is one of `values`.
    #[must_use]
    pub fn in_<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        self.condition(column, Operator::In, Value::Array(values))
    }

    /// Disjunction in the hosted backend's syntax, e.g.
    /// `status.eq.cancelled,and(price.gte.20,price.lte.40)`.
    #[must_use]
    pub fn or(mut self, expression: &str) -> Self {
        match parse_logic_tree(expression) {
            Ok(children) => self.plan.filters.push(Filter::Or(children)),
            Err(error) => self.fail(error.into()),
        }

        self
    }

    /// Negated comparison.
    #[must_use]
    pub fn not(mut self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.plan
            .filters
            .push(Filter::condition(column, operator, value).negate());
        self
    }

    /// Add an arbitrary filter expression.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.plan.filters.push(filter);
        self
    }

    /// Sort by `column`. A later call replaces an earlier one.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.plan.order = Some(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Return at most `count` rows.
    #[must_use]
    pub fn limit(mut self, count: usize) -> Self {
        self.plan.limit = Some(count);
        self
    }

    /// Turn the query into an update merging `payload` into matched rows.
    #[must_use]
    pub fn update(mut self, payload: Value) -> Self {
        match payload {
            Value::Object(payload) => self.plan.action = Action::Update(payload),
            other => self.fail(DataError::InvalidRecord(format!(
                "update payload must be an object, got {other}"
            ))),
        }

        self
    }

    /// Turn the query into a delete of matched rows.
    #[must_use]
    pub fn delete(mut self) -> Self {
        self.plan.action = Action::Delete;
        self
    }

    /// Run the plan.
    ///
    /// # Errors
    ///
    /// Returns the first chain error, or the data source's error.
    pub async fn execute(self) -> Result<Vec<Record>, DataError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        self.source.execute(self.plan).await
    }

    /// First matching row, if any.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute). No rows is `Ok(None)`.
    pub async fn single(self) -> Result<Option<Record>, DataError> {
        Ok(self.limit(1).execute().await?.into_iter().next())
    }

    /// Same as [`single`](Self::single).
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn maybe_single(self) -> Result<Option<Record>, DataError> {
        self.single().await
    }

    /// Insert one object or an array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidRecord`] when `rows` is not an object or
    /// an array of objects, or the data source's error.
    pub async fn insert(self, rows: Value) -> Result<Vec<Record>, DataError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let rows = records_from_value(rows).ok_or_else(|| {
            DataError::InvalidRecord("expected an object or an array of objects".to_string())
        })?;

        self.source.insert(self.plan.table, rows).await
    }

    fn condition(mut self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.plan
            .filters
            .push(Filter::condition(column, operator, value));
        self
    }

    fn fail(&mut self, error: DataError) {
        self.error.get_or_insert(error);
    }
}

impl IntoFuture for QueryBuilder {
    type Output = Result<Vec<Record>, DataError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::datasource::MockDataSource;

    use super::*;

    fn builder(source: MockDataSource) -> QueryBuilder {
        QueryBuilder::new(Arc::new(source), Table::Services)
    }

    #[tokio::test]
    async fn chain_accumulates_filters_order_and_limit() -> TestResult {
        let mut source = MockDataSource::new();

        source
            .expect_execute()
            .once()
            .withf(|plan| {
                plan.filters.len() == 2
                    && plan.limit == Some(5)
                    && plan.order.as_ref().map(|order| order.direction) == Some(Direction::Descending)
                    && plan.action == Action::Select
            })
            .return_once(|_| Ok(Vec::new()));

        let rows = builder(source)
            .eq("barbershop_id", "shop-a")
            .gte("price", 20)
            .order("price", Direction::Ascending)
            .order("price", Direction::Descending)
            .limit(5)
            .await?;

        assert!(rows.is_empty(), "mock returns no rows");

        Ok(())
    }

    #[tokio::test]
    async fn malformed_or_expressions_fail_at_the_terminal_call() {
        let mut source = MockDataSource::new();
        source.expect_execute().never();

        let result = builder(source).or("status.eq.cancelled,(").await;

        assert!(
            matches!(result, Err(DataError::InvalidFilter(_))),
            "parse errors surface when awaited"
        );
    }

    #[tokio::test]
    async fn single_limits_to_one_row() -> TestResult {
        let mut source = MockDataSource::new();

        source
            .expect_execute()
            .once()
            .withf(|plan| plan.limit == Some(1))
            .return_once(|_| Ok(records_from_value(json!([{ "id": "a" }])).unwrap_or_default()));

        let row = builder(source).eq("id", "a").single().await?;

        assert_eq!(row.and_then(|row| row.get("id").cloned()), Some(json!("a")));

        Ok(())
    }

    #[tokio::test]
    async fn no_rows_is_not_an_error() -> TestResult {
        let mut source = MockDataSource::new();
        source.expect_execute().return_once(|_| Ok(Vec::new()));

        assert_eq!(builder(source).maybe_single().await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn update_requires_an_object_payload() {
        let mut source = MockDataSource::new();
        source.expect_execute().never();

        let result = builder(source).update(json!(["not", "an", "object"])).await;

        assert!(matches!(result, Err(DataError::InvalidRecord(_))), "arrays are rejected");
    }

    #[tokio::test]
    async fn insert_accepts_objects_and_arrays() -> TestResult {
        let mut source = MockDataSource::new();

        source
            .expect_insert()
            .times(2)
            .withf(|table, _| *table == Table::Services)
            .returning(|_, rows| Ok(rows));

        let source: Arc<dyn DataSource> = Arc::new(source);

        let one = QueryBuilder::new(Arc::clone(&source), Table::Services)
            .insert(json!({ "name": "Corte" }))
            .await?;
        let many = QueryBuilder::new(Arc::clone(&source), Table::Services)
            .insert(json!([{ "name": "Corte" }, { "name": "Barba" }]))
            .await?;
        let scalar = QueryBuilder::new(source, Table::Services).insert(json!(42)).await;

        assert_eq!(one.len(), 1, "an object is one row");
        assert_eq!(many.len(), 2, "an array is many rows");
        assert!(matches!(scalar, Err(DataError::InvalidRecord(_))), "scalars are rejected");

        Ok(())
    }
}
