//! Record Store
//!
//! Owns table initialization, id generation, the row visibility filter and
//! the execution of query plans against the persistence backing.

use std::sync::{PoisonError, RwLock};

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    context::CallerContext,
    plan::{Action, QueryPlan},
    procedures::{
        CreateBarbershopParams, Procedure, ProcedureError, build_new_barbershop,
    },
    records::{
        ID_COLUMN, Record, TENANT_COLUMN, has_id, merge, record_id, stamp_created, stamp_updated,
    },
    storage::{Persistence, StorageError},
    tables::Table,
};

mod seed;
mod visibility;

pub use seed::{ADMIN_EMAIL, ADMIN_USER_ID};
pub use visibility::is_visible;

/// Local table store with simulated row level security.
#[derive(Debug)]
pub struct RecordStore {
    persistence: Persistence,
    context: RwLock<CallerContext>,
}

impl RecordStore {
    /// Open a store over `persistence`, creating and seeding tables.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing cannot be read or written.
    pub fn open(persistence: Persistence) -> Result<Self, StorageError> {
        let store = Self {
            persistence,
            context: RwLock::new(CallerContext::anonymous()),
        };

        store.initialize()?;

        Ok(store)
    }

    /// Ensure every table exists and seed reference data. Safe to repeat.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing cannot be read or written.
    pub fn initialize(&self) -> Result<(), StorageError> {
        seed::initialize(&self.persistence, Timestamp::now())
    }

    /// The persistence backing.
    #[must_use]
    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Replace the caller context used by subsequent operations.
    pub fn set_context(&self, context: CallerContext) {
        debug!(
            tenant = context.tenant.as_ref().map(|tenant| tenant.as_str()),
            user = context.user.as_ref().map(|user| user.as_str()),
            role = context.role.map(|role| role.as_str()),
            "caller context changed"
        );

        *self.context.write().unwrap_or_else(PoisonError::into_inner) = context;
    }

    /// The current caller context.
    #[must_use]
    pub fn context(&self) -> CallerContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop the rows of `table` the current caller may not see.
    #[must_use]
    pub fn apply_visibility(&self, table: Table, records: Vec<Record>) -> Vec<Record> {
        let context = self.context();

        records
            .into_iter()
            .filter(|record| is_visible(table.visibility(), &context, record))
            .collect()
    }

    /// A random id not yet used in `table`.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be read.
    pub fn generate_id(&self, table: Table) -> Result<String, StorageError> {
        let existing = existing_ids(&self.persistence.read(table)?);

        Ok(unique_id(&existing))
    }

    /// Run a select, update or delete plan.
    ///
    /// Visibility and filters are applied first, then the mutation, then
    /// ordering and limit on the returned rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be read or written.
    pub fn execute(&self, plan: &QueryPlan) -> Result<Vec<Record>, StorageError> {
        let context = self.context();
        let policy = plan.table.visibility();
        let selected = |record: &Record| is_visible(policy, &context, record) && plan.matches(record);

        let mut result = match &plan.action {
            Action::Select => self
                .apply_visibility(plan.table, self.persistence.read(plan.table)?)
                .into_iter()
                .filter(|record| plan.matches(record))
                .collect(),
            Action::Update(payload) => {
                let mut stored = self.persistence.read(plan.table)?;
                let now = Timestamp::now();
                let mut changed = Vec::new();

                for record in &mut stored {
                    if !selected(record) {
                        continue;
                    }

                    merge(record, payload);
                    pin_tenant(plan.table, &context, record);
                    stamp_updated(record, now);

                    changed.push(record.clone());
                }

                if !changed.is_empty() {
                    self.persistence.write(plan.table, &stored)?;
                }

                changed
            }
            Action::Delete => {
                let (removed, kept): (Vec<Record>, Vec<Record>) = self
                    .persistence
                    .read(plan.table)?
                    .into_iter()
                    .partition(|record| selected(record));

                if !removed.is_empty() {
                    self.persistence.write(plan.table, &kept)?;
                }

                removed
            }
        };

        plan.finish(&mut result);

        debug!(
            table = %plan.table,
            action = action_name(&plan.action),
            rows = result.len(),
            "executed query plan"
        );

        Ok(result)
    }

    /// Append rows to `table`, stamping ids, timestamps and the tenant key.
    /// Caller-supplied ids are kept as-is and never checked for duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be read or written.
    pub fn insert(&self, table: Table, rows: Vec<Record>) -> Result<Vec<Record>, StorageError> {
        let context = self.context();
        let mut stored = self.persistence.read(table)?;
        let mut ids = existing_ids(&stored);
        let now = Timestamp::now();

        let inserted: Vec<Record> = rows
            .into_iter()
            .map(|mut row| {
                if context.is_admin() {
                    if let Some(tenant) = &context.tenant
                        && table.is_tenant_scoped()
                        && !row.contains_key(TENANT_COLUMN)
                    {
                        row.insert(TENANT_COLUMN.to_string(), Value::String(tenant.to_string()));
                    }
                } else {
                    pin_tenant(table, &context, &mut row);
                }

                if !has_id(&row) {
                    row.insert(ID_COLUMN.to_string(), Value::String(unique_id(&ids)));
                }

                if let Some(id) = record_id(&row) {
                    ids.insert(id.to_string());
                }

                stamp_created(&mut row, now);

                row
            })
            .collect();

        stored.extend(inserted.iter().cloned());

        self.persistence.write(table, &stored)?;

        debug!(table = %table, rows = inserted.len(), "inserted rows");

        Ok(inserted)
    }

    /// Every row of `table`, ignoring visibility. Used for export.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be read.
    pub fn dump(&self, table: Table) -> Result<Vec<Record>, StorageError> {
        self.persistence.read(table)
    }

    /// Destructively replace every row of `table`. Used for import.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be written.
    pub fn replace(&self, table: Table, rows: &[Record]) -> Result<(), StorageError> {
        self.persistence.write(table, rows)
    }

    /// Run a named procedure.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, invalid parameters, failed
    /// validation or storage failures. Validation happens before any write.
    pub fn call(&self, name: &str, params: Value) -> Result<Value, ProcedureError> {
        match name.parse::<Procedure>()? {
            Procedure::CreateBarbershopWithDefaults => {
                self.create_barbershop_with_defaults(&CreateBarbershopParams::from_value(params)?)
            }
        }
    }

    fn create_barbershop_with_defaults(
        &self,
        params: &CreateBarbershopParams,
    ) -> Result<Value, ProcedureError> {
        if let Some(plan_id) = &params.plan_id {
            let plans = self.persistence.read(Table::SubscriptionPlans)?;

            if !plans.iter().any(|plan| record_id(plan) == Some(plan_id.as_str())) {
                return Err(ProcedureError::Validation(format!(
                    "unknown subscription plan: {plan_id}"
                )));
            }
        }

        let mut tables: Vec<(Table, Vec<Record>)> = [
            Table::Barbershops,
            Table::Services,
            Table::Barbers,
            Table::BarbershopUsers,
        ]
        .into_iter()
        .map(|table| self.persistence.read(table).map(|rows| (table, rows)))
        .collect::<Result<_, _>>()?;

        let mut taken: Vec<(Table, FxHashSet<String>)> = tables
            .iter()
            .map(|(table, rows)| (*table, existing_ids(rows)))
            .collect();

        let built = build_new_barbershop(params, Timestamp::now(), |table| {
            let Some((_, ids)) = taken.iter_mut().find(|(candidate, _)| *candidate == table) else {
                return Uuid::new_v4().to_string();
            };

            let id = unique_id(ids);
            ids.insert(id.clone());
            id
        })?;

        for (table, new_rows) in built.rows_by_table() {
            if let Some((_, rows)) = tables.iter_mut().find(|(candidate, _)| *candidate == table) {
                rows.extend(new_rows);
            }
        }

        self.persistence.write_batch(&tables)?;

        let barbershop_id = record_id(&built.barbershop).unwrap_or_default();

        debug!(barbershop = barbershop_id, "created barbershop with defaults");

        Ok(built.to_value())
    }
}

/// Non-admin callers can only write rows into their own tenant.
fn pin_tenant(table: Table, context: &CallerContext, record: &mut Record) {
    if context.is_admin() || !table.is_tenant_scoped() {
        return;
    }

    if let Some(tenant) = &context.tenant {
        record.insert(TENANT_COLUMN.to_string(), Value::String(tenant.to_string()));
    }
}

fn existing_ids(records: &[Record]) -> FxHashSet<String> {
    records
        .iter()
        .filter_map(record_id)
        .map(str::to_string)
        .collect()
}

fn unique_id(existing: &FxHashSet<String>) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();

        if !existing.contains(&candidate) {
            return candidate;
        }
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Select => "select",
        Action::Update(_) => "update",
        Action::Delete => "delete",
    }
}
