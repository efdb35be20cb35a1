//! Local data source.

use std::sync::Arc;

use async_trait::async_trait;
use barberbook_core::{
    context::CallerContext, plan::QueryPlan, records::Record, store::RecordStore, tables::Table,
};
use serde_json::Value;

use crate::{
    datasource::{Backend, DataSource},
    errors::DataError,
};

/// Runs plans against an in-process [`RecordStore`].
#[derive(Debug, Clone)]
pub struct LocalDataSource {
    store: Arc<RecordStore>,
}

impl LocalDataSource {
    /// Serve queries from `store`.
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }
}

#[async_trait]
impl DataSource for LocalDataSource {
    async fn execute(&self, plan: QueryPlan) -> Result<Vec<Record>, DataError> {
        Ok(self.store.execute(&plan)?)
    }

    async fn insert(&self, table: Table, rows: Vec<Record>) -> Result<Vec<Record>, DataError> {
        Ok(self.store.insert(table, rows)?)
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, DataError> {
        Ok(self.store.call(name, params)?)
    }

    async fn dump(&self, table: Table) -> Result<Vec<Record>, DataError> {
        Ok(self.store.dump(table)?)
    }

    async fn replace(&self, table: Table, rows: Vec<Record>) -> Result<(), DataError> {
        Ok(self.store.replace(table, &rows)?)
    }

    fn set_context(&self, context: CallerContext) {
        self.store.set_context(context);
    }

    fn backend(&self) -> Backend {
        Backend::Local
    }
}
