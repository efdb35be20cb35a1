//! Data Sources
//!
//! A data source executes query plans. The local source runs them against the
//! in-process record store; the hosted source translates them to HTTP calls.

use async_trait::async_trait;
use barberbook_core::{context::CallerContext, plan::QueryPlan, records::Record, tables::Table};
use mockall::automock;
use serde_json::Value;

use crate::errors::DataError;

mod local;

pub use local::LocalDataSource;

/// Which kind of backend a data source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process record store.
    Local,
    /// Hosted backend over HTTP.
    Remote,
}

/// Executes query plans, inserts and procedures.
#[automock]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run a select, update or delete plan.
    async fn execute(&self, plan: QueryPlan) -> Result<Vec<Record>, DataError>;

    /// Insert rows and return them as stored.
    async fn insert(&self, table: Table, rows: Vec<Record>) -> Result<Vec<Record>, DataError>;

    /// Call a named procedure.
    async fn rpc(&self, name: &str, params: Value) -> Result<Value, DataError>;

    /// Every row of `table`, bypassing the caller context where possible.
    async fn dump(&self, table: Table) -> Result<Vec<Record>, DataError>;

    /// Replace every row of `table`.
    async fn replace(&self, table: Table, rows: Vec<Record>) -> Result<(), DataError>;

    /// Set the caller context for subsequent calls.
    fn set_context(&self, context: CallerContext);

    /// Which backend this source talks to.
    fn backend(&self) -> Backend;
}
