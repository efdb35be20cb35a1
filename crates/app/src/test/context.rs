//! Test context for adapter-level tests over an in-memory store.

use std::sync::Arc;

use barberbook_core::{
    context::{CallerContext, Role, TenantId, UserId},
    storage::{Persistence, StorageError},
    store::{ADMIN_USER_ID, RecordStore},
};

use crate::database::Database;

pub(crate) struct TestContext {
    pub store: Arc<RecordStore>,
    pub database: Database,
}

impl TestContext {
    pub fn new() -> Result<Self, StorageError> {
        let store = Arc::new(RecordStore::open(Persistence::in_memory())?);

        Ok(Self {
            database: Database::local(Arc::clone(&store)),
            store,
        })
    }

    /// Act as the operator of `tenant`.
    pub fn act_as_member(&self, tenant: &str) {
        self.database.set_context(CallerContext::member(
            TenantId::new(tenant),
            UserId::new(format!("{tenant}-owner")),
            Role::Barbershop,
        ));
    }

    /// Act as the seeded administrator.
    pub fn act_as_admin(&self) {
        self.database
            .set_context(CallerContext::admin(UserId::new(ADMIN_USER_ID)));
    }
}
