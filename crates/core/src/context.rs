//! Caller Context
//!
//! The ambient identity used by the record store's row visibility filter.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::TypedId;

/// Marker for barbershop (tenant) ids.
#[derive(Debug)]
pub enum Tenant {}

/// Marker for user ids.
#[derive(Debug)]
pub enum User {}

/// Barbershop id; the unit of data isolation.
pub type TenantId = TypedId<Tenant>;

/// Authenticated user id.
pub type UserId = TypedId<User>;

/// Caller roles known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform administrator; bypasses row visibility.
    Admin,
    /// Barbershop operator.
    Barbershop,
    /// Staff member.
    Barber,
    /// Booking customer.
    Client,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Barbershop => "barbershop",
            Self::Barber => "barber",
            Self::Client => "client",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing an unrecognised role name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "barbershop" => Ok(Self::Barbershop),
            "barber" => Ok(Self::Barber),
            "client" => Ok(Self::Client),
            _ => Err(UnknownRoleError(value.to_string())),
        }
    }
}

/// Who is calling: active tenant, user and role. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// Active barbershop.
    pub tenant: Option<TenantId>,

    /// Signed-in user.
    pub user: Option<UserId>,

    /// Role of the signed-in user.
    pub role: Option<Role>,
}

impl CallerContext {
    /// No identity at all.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a context from its three parts.
    #[must_use]
    pub fn new(tenant: Option<TenantId>, user: Option<UserId>, role: Option<Role>) -> Self {
        Self { tenant, user, role }
    }

    /// An administrator, optionally acting on behalf of a tenant.
    #[must_use]
    pub fn admin(user: UserId) -> Self {
        Self {
            tenant: None,
            user: Some(user),
            role: Some(Role::Admin),
        }
    }

    /// A tenant member with the given role.
    #[must_use]
    pub fn member(tenant: TenantId, user: UserId, role: Role) -> Self {
        Self {
            tenant: Some(tenant),
            user: Some(user),
            role: Some(role),
        }
    }

    /// Whether the caller bypasses row visibility.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}
