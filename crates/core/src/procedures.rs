//! Named Procedures
//!
//! The local store recognises a single procedure: creating a barbershop
//! together with its default service catalog and a default staff record.
//! Records are built and validated in memory before anything is written.

use std::str::FromStr;

use jiff::Timestamp;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    records::{Record, TENANT_COLUMN, records_from_value, stamp_created},
    storage::StorageError,
    tables::Table,
};

/// Name of the barbershop creation procedure.
pub const CREATE_BARBERSHOP_WITH_DEFAULTS: &str = "create_barbershop_with_defaults";

/// Procedures the local store can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// See [`CREATE_BARBERSHOP_WITH_DEFAULTS`].
    CreateBarbershopWithDefaults,
}

impl FromStr for Procedure {
    type Err = ProcedureError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            CREATE_BARBERSHOP_WITH_DEFAULTS => Ok(Self::CreateBarbershopWithDefaults),
            _ => Err(ProcedureError::Unknown(name.to_string())),
        }
    }
}

/// Errors raised while running a procedure.
#[derive(Debug, Error)]
pub enum ProcedureError {
    /// No procedure has this name.
    #[error("procedure {0:?} is not recognized by the local store")]
    Unknown(String),

    /// Parameters do not decode into the procedure's input.
    #[error("invalid procedure parameters: {0}")]
    InvalidParams(#[source] serde_json::Error),

    /// Parameters decoded but were rejected.
    #[error("{0}")]
    Validation(String),

    /// The batch could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Parameters of [`Procedure::CreateBarbershopWithDefaults`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBarbershopParams {
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

impl CreateBarbershopParams {
    /// Decode from the raw procedure parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when `params` does not have the expected shape.
    pub fn from_value(params: Value) -> Result<Self, ProcedureError> {
        serde_json::from_value(params).map_err(ProcedureError::InvalidParams)
    }
}

/// Every record the procedure will commit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBarbershop {
    pub barbershop: Record,
    pub services: Vec<Record>,
    pub barber: Record,
    pub membership: Option<Record>,
}

impl NewBarbershop {
    /// The procedure's result document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "barbershop": self.barbershop,
            "services": self.services,
            "barber": self.barber,
            "membership": self.membership,
        })
    }

    /// Records grouped by destination table.
    #[must_use]
    pub fn rows_by_table(&self) -> Vec<(Table, Vec<Record>)> {
        let mut rows = vec![
            (Table::Barbershops, vec![self.barbershop.clone()]),
            (Table::Services, self.services.clone()),
            (Table::Barbers, vec![self.barber.clone()]),
        ];

        if let Some(membership) = &self.membership {
            rows.push((Table::BarbershopUsers, vec![membership.clone()]));
        }

        rows
    }
}

fn default_services() -> Value {
    json!([
        { "name": "Corte", "description": "Corte de cabelo masculino", "price": 25.0, "duration_minutes": 30 },
        { "name": "Barba", "description": "Barba feita na navalha", "price": 15.0, "duration_minutes": 20 },
        { "name": "Corte e Barba", "description": "Corte de cabelo e barba", "price": 35.0, "duration_minutes": 50 },
    ])
}

/// Build the barbershop, its default services, its first barber and the
/// owner's membership. `next_id` supplies a fresh id for the given table.
///
/// # Errors
///
/// Returns a validation error when the name is blank or the email is
/// malformed.
pub fn build_new_barbershop(
    params: &CreateBarbershopParams,
    now: Timestamp,
    mut next_id: impl FnMut(Table) -> String,
) -> Result<NewBarbershop, ProcedureError> {
    let name = params.name.trim();

    if name.is_empty() {
        return Err(ProcedureError::Validation("barbershop name is required".to_string()));
    }

    if let Some(email) = &params.email
        && !is_plausible_email(email)
    {
        return Err(ProcedureError::Validation(format!("invalid email address: {email}")));
    }

    let barbershop_id = next_id(Table::Barbershops);

    let mut barbershop = object(json!({
        "id": barbershop_id,
        "name": name,
        "email": params.email,
        "phone": params.phone,
        "address": params.address,
        "owner_id": params.owner_id,
        "plan_id": params.plan_id,
        "is_active": true,
    }));
    stamp_created(&mut barbershop, now);

    let services: Vec<Record> = records_from_value(default_services())
        .unwrap_or_default()
        .into_iter()
        .map(|mut service| {
            service.insert("id".to_string(), Value::String(next_id(Table::Services)));
            service.insert(TENANT_COLUMN.to_string(), Value::String(barbershop_id.clone()));
            service.insert("is_active".to_string(), Value::Bool(true));
            stamp_created(&mut service, now);
            service
        })
        .collect();

    let mut barber = object(json!({
        "id": next_id(Table::Barbers),
        "barbershop_id": barbershop_id,
        "user_id": params.owner_id,
        "name": params.owner_name.as_deref().unwrap_or("Barbeiro Principal"),
        "email": params.email,
        "phone": params.phone,
        "commission_rate": 0,
        "is_active": true,
    }));
    stamp_created(&mut barber, now);

    let membership = params.owner_id.as_ref().map(|owner| {
        let mut membership = object(json!({
            "id": next_id(Table::BarbershopUsers),
            "barbershop_id": barbershop_id,
            "user_id": owner,
            "role": "owner",
        }));
        stamp_created(&mut membership, now);
        membership
    });

    Ok(NewBarbershop {
        barbershop,
        services,
        barber,
        membership,
    })
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}

fn is_plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn params(name: &str) -> CreateBarbershopParams {
        CreateBarbershopParams {
            name: name.to_string(),
            owner_id: Some("owner-1".to_string()),
            owner_name: Some("João".to_string()),
            email: Some("contato@navalha.com".to_string()),
            phone: None,
            address: None,
            plan_id: None,
        }
    }

    #[test]
    fn unknown_procedure_names_are_rejected() {
        assert!(matches!(
            "drop_everything".parse::<Procedure>(),
            Err(ProcedureError::Unknown(name)) if name == "drop_everything"
        ));
    }

    #[test]
    fn children_reference_the_new_barbershop() -> TestResult {
        let mut counter = 0;
        let built = build_new_barbershop(&params("Navalha de Ouro"), Timestamp::now(), |table| {
            counter += 1;
            format!("{table}-{counter}")
        })?;

        let shop_id = built.barbershop.get("id").cloned().ok_or("missing id")?;

        assert_eq!(built.services.len(), 3);
        assert!(built.services.iter().all(|s| s.get(TENANT_COLUMN) == Some(&shop_id)));
        assert_eq!(built.barber.get(TENANT_COLUMN), Some(&shop_id));
        assert_eq!(built.rows_by_table().len(), 4);

        Ok(())
    }

    #[test]
    fn blank_names_and_bad_emails_fail_validation() {
        let blank = build_new_barbershop(&params("   "), Timestamp::now(), |_| "x".to_string());

        let mut bad_email = params("Navalha");
        bad_email.email = Some("not-an-email".to_string());
        let bad_email = build_new_barbershop(&bad_email, Timestamp::now(), |_| "x".to_string());

        assert!(matches!(blank, Err(ProcedureError::Validation(_))));
        assert!(matches!(bad_email, Err(ProcedureError::Validation(_))));
    }
}
