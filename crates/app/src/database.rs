//! Database Adapter
//!
//! Single entry point for data access. The backend is picked once, when the
//! adapter is built, and never revisited.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use barberbook_core::{
    context::CallerContext, snapshot::Snapshot, storage::Persistence,
    store::RecordStore, tables::Table,
};
use jiff::Timestamp;
use serde_json::Value;
use tracing::info;

use crate::{
    auth::{AuthProvider, RemoteAuth, SimulatedAuth},
    config::DatabaseConfig,
    datasource::{Backend, DataSource, LocalDataSource},
    errors::DataError,
    query::QueryBuilder,
    remote::{RemoteClient, RemoteConfig},
};

/// Data and auth access over one backend.
#[derive(Clone)]
pub struct Database {
    source: Arc<dyn DataSource>,
    auth: Arc<dyn AuthProvider>,
}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Database")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Local adapter over `store`; sessions live in the store's persistence.
    #[must_use]
    pub fn local(store: Arc<RecordStore>) -> Self {
        let auth = SimulatedAuth::new(store.persistence().clone());

        Self {
            source: Arc::new(LocalDataSource::new(store)),
            auth: Arc::new(auth),
        }
    }

    /// Hosted adapter; sessions are kept in `sessions`.
    #[must_use]
    pub fn remote(config: RemoteConfig, sessions: Persistence) -> Self {
        Self {
            source: Arc::new(RemoteClient::new(config.clone()).with_sessions(sessions.clone())),
            auth: Arc::new(RemoteAuth::new(config, sessions)),
        }
    }

    /// Adapter over arbitrary parts.
    #[must_use]
    pub fn from_parts(source: Arc<dyn DataSource>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { source, auth }
    }

    /// Build the adapter `config` asks for.
    ///
    /// # Errors
    ///
    /// Returns an error when the hosted backend is selected without its
    /// settings, or when local storage cannot be opened.
    pub fn open(config: &DatabaseConfig) -> Result<Self, DataError> {
        let persistence = config.persistence()?;

        if config.use_local {
            info!(persistent = config.data_dir.is_some(), "using local record store");

            return Ok(Self::local(Arc::new(RecordStore::open(persistence)?)));
        }

        let remote = config.remote()?;

        info!(url = %remote.url, "using hosted backend");

        Ok(Self::remote(remote, persistence))
    }

    /// Which backend this adapter talks to.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.source.backend()
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn from(&self, table: Table) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.source), table)
    }

    /// Start a query against the table called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a known table.
    pub fn table(&self, name: &str) -> Result<QueryBuilder, DataError> {
        Ok(self.from(name.parse()?))
    }

    /// The identity surface.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    /// Call a named procedure.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownProcedure`] for names the backend does not
    /// know, [`DataError::Validation`] for rejected parameters.
    pub async fn rpc(&self, name: &str, params: Value) -> Result<Value, DataError> {
        self.source.rpc(name, params).await
    }

    /// Set the caller context used for row visibility. Ignored by the hosted
    /// backend, which derives it from the session.
    pub fn set_context(&self, context: CallerContext) {
        self.source.set_context(context);
    }

    /// Every row of every table in one document.
    ///
    /// # Errors
    ///
    /// Returns an error when any table cannot be read.
    pub async fn export(&self) -> Result<Snapshot, DataError> {
        let mut snapshot = Snapshot::new(Timestamp::now());

        for table in Table::ALL {
            snapshot.insert_table(table, self.source.dump(table).await?);
        }

        info!(rows = snapshot.row_count(), "exported snapshot");

        Ok(snapshot)
    }

    /// Replace every table named in `snapshot` with its rows. Unknown table
    /// names are rejected before anything is written. Returns the number of
    /// rows written.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid snapshots or failed writes. A failed write
    /// leaves earlier tables replaced.
    pub async fn import(&self, snapshot: &Snapshot) -> Result<usize, DataError> {
        let tables = snapshot.tables()?;
        let mut written = 0;

        for (table, rows) in tables {
            let rows = rows.to_vec();
            written += rows.len();

            self.source.replace(table, rows).await?;
        }

        info!(rows = written, "imported snapshot");

        Ok(written)
    }
}

/// Copy every table from `source` into `target`, replacing its contents.
///
/// # Errors
///
/// Returns an error when the export or the import fails.
pub async fn migrate(source: &Database, target: &Database) -> Result<usize, DataError> {
    info!(from = ?source.backend(), to = ?target.backend(), "migrating data");

    let snapshot = source.export().await?;

    target.import(&snapshot).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use testresult::TestResult;

    use crate::{auth::MockAuthProvider, datasource::MockDataSource};

    use super::*;

    fn database(source: MockDataSource) -> Database {
        Database::from_parts(Arc::new(source), Arc::new(MockAuthProvider::new()))
    }

    #[tokio::test]
    async fn export_reads_every_table() -> TestResult {
        let mut source = MockDataSource::new();

        source
            .expect_dump()
            .times(Table::ALL.len())
            .returning(|_| Ok(Vec::new()));

        let snapshot = database(source).export().await?;

        assert_eq!(snapshot.tables.len(), Table::ALL.len());

        Ok(())
    }

    #[tokio::test]
    async fn import_rejects_unknown_tables_before_writing() {
        let mut source = MockDataSource::new();
        source.expect_replace().never();

        let mut snapshot = Snapshot::new(Timestamp::now());
        snapshot.tables = BTreeMap::from([
            ("services".to_string(), Vec::new()),
            ("invoices".to_string(), Vec::new()),
        ]);

        let result = database(source).import(&snapshot).await;

        assert!(matches!(result, Err(DataError::Snapshot(_))), "unknown table should fail");
    }

    #[tokio::test]
    async fn rpc_and_context_pass_through() -> TestResult {
        let mut source = MockDataSource::new();

        source
            .expect_rpc()
            .once()
            .withf(|name, _| name == "create_barbershop_with_defaults")
            .returning(|_, _| Ok(json!({ "barbershop": { "id": "shop" } })));
        source
            .expect_set_context()
            .once()
            .withf(CallerContext::is_admin)
            .return_const(());

        let database = database(source);

        database.set_context(CallerContext::admin(barberbook_core::context::UserId::new("root")));
        let result = database
            .rpc("create_barbershop_with_defaults", json!({ "name": "Navalha" }))
            .await?;

        assert_eq!(result.pointer("/barbershop/id"), Some(&json!("shop")));

        Ok(())
    }

    #[test]
    fn unknown_table_names_are_rejected() {
        let database = database(MockDataSource::new());

        assert!(matches!(database.table("haircuts"), Err(DataError::UnknownTable(_))));
    }

    mod local {
        use barberbook_core::{plan::Direction, records::TENANT_COLUMN};
        use serde_json::json;
        use testresult::TestResult;

        use crate::test::TestContext;

        use super::super::*;

        #[tokio::test]
        async fn members_only_see_their_own_services() -> TestResult {
            let ctx = TestContext::new()?;

            ctx.act_as_member("shop-a");
            ctx.database
                .from(Table::Services)
                .insert(json!({ "name": "Corte", "price": 25 }))
                .await?;

            ctx.act_as_member("shop-b");
            ctx.database
                .from(Table::Services)
                .insert(json!({ "name": "Barba", "price": 15 }))
                .await?;

            let visible = ctx.database.from(Table::Services).await?;

            assert_eq!(visible.len(), 1, "shop-b sees only its own row");
            assert_eq!(
                visible.first().and_then(|row| row.get(TENANT_COLUMN)),
                Some(&json!("shop-b"))
            );

            ctx.act_as_admin();

            let all = ctx
                .database
                .from(Table::Services)
                .order("price", Direction::Descending)
                .await?;

            assert_eq!(all.len(), 2, "admins see every tenant");
            assert_eq!(
                all.first().and_then(|row| row.get("name")),
                Some(&json!("Corte"))
            );

            Ok(())
        }

        #[tokio::test]
        async fn unknown_procedures_are_reported() -> TestResult {
            let ctx = TestContext::new()?;

            let result = ctx.database.rpc("drop_everything", json!({})).await;

            assert!(
                matches!(result, Err(DataError::UnknownProcedure(name)) if name == "drop_everything"),
                "unknown procedure should be named in the error"
            );

            Ok(())
        }

        #[tokio::test]
        async fn export_then_import_restores_a_store() -> TestResult {
            let ctx = TestContext::new()?;
            ctx.database
                .rpc(
                    "create_barbershop_with_defaults",
                    json!({ "name": "Navalha", "owner_id": "owner-1" }),
                )
                .await?;

            let snapshot = ctx.database.export().await?;

            let restored = TestContext::new()?;
            let written = restored.database.import(&snapshot).await?;

            assert_eq!(written, snapshot.row_count());
            assert_eq!(
                restored.store.dump(Table::Services)?,
                ctx.store.dump(Table::Services)?
            );

            Ok(())
        }
    }
}
