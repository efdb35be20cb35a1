//! Table Records
//!
//! Records are schema-less JSON objects. The store only knows about the
//! implicit `id`, `created_at` and `updated_at` columns and the tenant
//! foreign key.

use jiff::{SignedDuration, Timestamp};
use serde_json::{Map, Value};

/// A single row: column name to JSON value.
pub type Record = Map<String, Value>;

/// Primary key column present on every record.
pub const ID_COLUMN: &str = "id";

/// Creation timestamp column.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Last mutation timestamp column.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Tenant foreign key on tenant-scoped tables.
pub const TENANT_COLUMN: &str = "barbershop_id";

/// Returns the record's id when it is a string.
#[must_use]
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_COLUMN).and_then(Value::as_str)
}

/// Returns `true` when the record carries a usable id.
#[must_use]
pub fn has_id(record: &Record) -> bool {
    record.get(ID_COLUMN).is_some_and(|id| match id {
        Value::Null => false,
        Value::String(id) => !id.is_empty(),
        _ => true,
    })
}

/// Reads a timestamp column, ignoring values that do not parse.
#[must_use]
pub fn timestamp(record: &Record, column: &str) -> Option<Timestamp> {
    record
        .get(column)
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
}

/// Stamps both timestamp columns with the same instant.
pub fn stamp_created(record: &mut Record, now: Timestamp) {
    let value = Value::String(now.to_string());

    record.insert(CREATED_AT_COLUMN.to_string(), value.clone());
    record.insert(UPDATED_AT_COLUMN.to_string(), value);
}

/// Refreshes `updated_at`, keeping it strictly after its previous value even
/// when the clock has not advanced.
pub fn stamp_updated(record: &mut Record, now: Timestamp) {
    let next = match timestamp(record, UPDATED_AT_COLUMN) {
        Some(previous) if now <= previous => previous
            .checked_add(SignedDuration::from_micros(1))
            .unwrap_or(now),
        _ => now,
    };

    record.insert(UPDATED_AT_COLUMN.to_string(), Value::String(next.to_string()));
}

/// Merges `payload` over `record`. The `id` column is never overwritten.
pub fn merge(record: &mut Record, payload: &Record) {
    for (column, value) in payload {
        if column == ID_COLUMN {
            continue;
        }

        record.insert(column.clone(), value.clone());
    }
}

/// Splits a JSON value into records: an object becomes one record, an array
/// of objects becomes many. Returns `None` for anything else.
#[must_use]
pub fn records_from_value(value: Value) -> Option<Vec<Record>> {
    match value {
        Value::Object(record) => Some(vec![record]),
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}
