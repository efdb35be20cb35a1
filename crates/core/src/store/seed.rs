//! Reference data written on first start.

use jiff::Timestamp;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    context::Role,
    records::{Record, records_from_value, stamp_created},
    storage::{Persistence, StorageError},
    tables::Table,
};

/// User id of the seeded administrator.
pub const ADMIN_USER_ID: &str = "00000000-0000-4000-8000-000000000001";

/// Email of the seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@barberbook.local";

fn plan_catalog() -> Value {
    json!([
        {
            "id": "plan-basic",
            "name": "Básico",
            "price": 49.9,
            "billing_period": "monthly",
            "max_barbers": 1,
            "features": ["agenda", "clientes"],
            "is_active": true,
        },
        {
            "id": "plan-professional",
            "name": "Profissional",
            "price": 99.9,
            "billing_period": "monthly",
            "max_barbers": 5,
            "features": ["agenda", "clientes", "financeiro", "promocoes"],
            "is_active": true,
        },
        {
            "id": "plan-premium",
            "name": "Premium",
            "price": 199.9,
            "billing_period": "monthly",
            "max_barbers": null,
            "features": ["agenda", "clientes", "financeiro", "promocoes", "relatorios"],
            "is_active": true,
        },
    ])
}

/// Make sure every table exists, then seed the plan catalog and the
/// administrator when they are missing.
pub(super) fn initialize(persistence: &Persistence, now: Timestamp) -> Result<(), StorageError> {
    let stored = persistence.names()?;

    for table in Table::ALL {
        if !stored.iter().any(|name| name == table.as_str()) {
            persistence.write(table, &[])?;
        }
    }

    if persistence.read(Table::SubscriptionPlans)?.is_empty() {
        let plans = stamped(plan_catalog(), now);

        info!(count = plans.len(), "seeding subscription plans");

        persistence.write(Table::SubscriptionPlans, &plans)?;
    }

    let mut roles = persistence.read(Table::UserRoles)?;

    let has_admin = roles
        .iter()
        .any(|role| role.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str()));

    if !has_admin {
        info!(user_id = ADMIN_USER_ID, "seeding administrator");

        let mut profiles = persistence.read(Table::Profiles)?;

        profiles.extend(stamped(
            json!({
                "id": ADMIN_USER_ID,
                "email": ADMIN_EMAIL,
                "full_name": "Administrador",
            }),
            now,
        ));

        roles.extend(stamped(
            json!({
                "id": "00000000-0000-4000-8000-0000000000a1",
                "user_id": ADMIN_USER_ID,
                "role": Role::Admin.as_str(),
            }),
            now,
        ));

        persistence.write_batch(&[(Table::Profiles, profiles), (Table::UserRoles, roles)])?;
    }

    Ok(())
}

fn stamped(value: Value, now: Timestamp) -> Vec<Record> {
    records_from_value(value)
        .unwrap_or_default()
        .into_iter()
        .map(|mut record| {
            stamp_created(&mut record, now);
            record
        })
        .collect()
}
