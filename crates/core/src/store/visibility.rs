//! Row Level Security simulation.

use serde_json::Value;

use crate::{
    context::CallerContext,
    records::{ID_COLUMN, Record, TENANT_COLUMN},
    tables::Visibility,
};

/// Whether `record` is visible to `context` under `policy`.
///
/// Admins see everything. A scoped table without the matching context part
/// (no tenant for tenant-scoped rows, no user for owner-scoped rows) is left
/// unfiltered.
#[must_use]
pub fn is_visible(policy: Visibility, context: &CallerContext, record: &Record) -> bool {
    if context.is_admin() {
        return true;
    }

    match policy {
        Visibility::Unscoped => true,
        Visibility::ScopedByTenant => context
            .tenant
            .as_ref()
            .is_none_or(|tenant| column_equals(record, TENANT_COLUMN, tenant.as_str())),
        Visibility::ScopedByOwnerId => context
            .user
            .as_ref()
            .is_none_or(|user| column_equals(record, ID_COLUMN, user.as_str())),
    }
}

fn column_equals(record: &Record, column: &str, expected: &str) -> bool {
    matches!(record.get(column), Some(Value::String(value)) if value == expected)
}
