//! Record store behaviour over the file-backed persistence layer.

use std::sync::Arc;

use barberbook_core::{
    context::{CallerContext, Role, TenantId, UserId},
    filter::{Filter, parse_logic_tree},
    plan::{Action, QueryPlan},
    records::records_from_value,
    storage::{DEFAULT_KEY_PREFIX, FileStore, Persistence},
    store::RecordStore,
    tables::Table,
};
use serde_json::{Value, json};
use testresult::TestResult;

fn open(root: &std::path::Path) -> TestResult<RecordStore> {
    let backend = FileStore::open(root)?;

    Ok(RecordStore::open(Persistence::new(Arc::new(backend), DEFAULT_KEY_PREFIX))?)
}

#[test]
fn rows_survive_reopening_the_store() -> TestResult {
    let dir = tempfile::tempdir()?;

    let inserted = {
        let store = open(dir.path())?;
        store.insert(
            Table::Services,
            records_from_value(json!({ "name": "Corte", "price": 25 })).ok_or("not a record")?,
        )?
    };

    let store = open(dir.path())?;
    let services = store.execute(&QueryPlan::new(Table::Services))?;

    assert_eq!(services, inserted, "reopened store should see the same rows");
    assert_eq!(
        store.dump(Table::UserRoles)?.len(),
        1,
        "reopening must not seed a second administrator"
    );
    assert!(
        dir.path().join("barberbook_services.json").exists(),
        "each table is one file"
    );

    Ok(())
}

#[test]
fn parsed_or_expressions_select_and_delete() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = open(dir.path())?;

    store.set_context(CallerContext::member(
        TenantId::new("shop-a"),
        UserId::new("owner"),
        Role::Barbershop,
    ));
    store.insert(
        Table::Appointments,
        records_from_value(json!([
            { "id": "1", "status": "cancelled", "price": 25 },
            { "id": "2", "status": "confirmed", "price": 60 },
            { "id": "3", "status": "confirmed", "price": 20 },
        ]))
        .ok_or("not records")?,
    )?;

    let mut plan = QueryPlan::new(Table::Appointments);
    plan.filters = vec![Filter::Or(parse_logic_tree("(status.eq.cancelled,price.gt.50)")?)];
    plan.action = Action::Delete;

    let removed = store.execute(&plan)?;
    let remaining = store.execute(&QueryPlan::new(Table::Appointments))?;

    let ids = |rows: &[barberbook_core::records::Record]| -> Vec<Value> {
        rows.iter().filter_map(|row| row.get("id").cloned()).collect()
    };

    assert_eq!(ids(&removed), [json!("1"), json!("2")], "or matches either branch");
    assert_eq!(ids(&remaining), [json!("3")], "unmatched rows stay");

    Ok(())
}
