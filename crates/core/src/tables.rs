//! Known Tables

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use thiserror::Error;

/// How rows of a table are filtered for non-admin callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every caller sees every row.
    Unscoped,

    /// Rows are limited to the caller's barbershop via `barbershop_id`.
    ScopedByTenant,

    /// Rows are limited to the one whose `id` is the caller's user id.
    ScopedByOwnerId,
}

/// The closed set of tables the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Barbershops (tenants).
    Barbershops,
    /// Staff members of a barbershop.
    Barbers,
    /// Customers of a barbershop.
    Clients,
    /// Service catalog of a barbershop.
    Services,
    /// Booked appointments.
    Appointments,
    /// Income and expense entries.
    FinancialTransactions,
    /// Recurring cost definitions.
    CostItems,
    /// Recorded costs.
    CostRecords,
    /// Discount campaigns.
    Promotions,
    /// User profiles.
    Profiles,
    /// Role assignments per user.
    UserRoles,
    /// Subscription plan catalog.
    SubscriptionPlans,
    /// Membership of users in barbershops.
    BarbershopUsers,
}

impl Table {
    /// Every known table, in seeding order.
    pub const ALL: [Self; 13] = [
        Self::Barbershops,
        Self::Barbers,
        Self::Clients,
        Self::Services,
        Self::Appointments,
        Self::FinancialTransactions,
        Self::CostItems,
        Self::CostRecords,
        Self::Promotions,
        Self::Profiles,
        Self::UserRoles,
        Self::SubscriptionPlans,
        Self::BarbershopUsers,
    ];

    /// Storage and wire name of the table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Barbershops => "barbershops",
            Self::Barbers => "barbers",
            Self::Clients => "clients",
            Self::Services => "services",
            Self::Appointments => "appointments",
            Self::FinancialTransactions => "financial_transactions",
            Self::CostItems => "cost_items",
            Self::CostRecords => "cost_records",
            Self::Promotions => "promotions",
            Self::Profiles => "profiles",
            Self::UserRoles => "user_roles",
            Self::SubscriptionPlans => "subscription_plans",
            Self::BarbershopUsers => "barbershop_users",
        }
    }

    /// Row visibility policy. Adding a table forces a decision here.
    #[must_use]
    pub const fn visibility(self) -> Visibility {
        match self {
            Self::Barbers
            | Self::Clients
            | Self::Services
            | Self::Appointments
            | Self::FinancialTransactions
            | Self::CostItems
            | Self::CostRecords
            | Self::Promotions
            | Self::BarbershopUsers => Visibility::ScopedByTenant,
            Self::Profiles => Visibility::ScopedByOwnerId,
            Self::Barbershops | Self::UserRoles | Self::SubscriptionPlans => Visibility::Unscoped,
        }
    }

    /// Whether inserts into this table carry the tenant foreign key.
    #[must_use]
    pub const fn is_tenant_scoped(self) -> bool {
        matches!(self.visibility(), Visibility::ScopedByTenant)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Raised when a table name is not one of [`Table::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown table: {0}")]
pub struct UnknownTableError(pub String);

impl FromStr for Table {
    type Err = UnknownTableError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == value)
            .ok_or_else(|| UnknownTableError(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn names_round_trip_through_from_str() -> TestResult {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>()?, table);
        }

        Ok(())
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "haircuts".parse::<Table>(),
            Err(UnknownTableError("haircuts".to_string()))
        );
    }

    #[test]
    fn profiles_are_owner_scoped_and_barbershops_are_public() {
        assert_eq!(Table::Profiles.visibility(), Visibility::ScopedByOwnerId);
        assert_eq!(Table::Barbershops.visibility(), Visibility::Unscoped);
        assert!(Table::Appointments.is_tenant_scoped());
    }
}
