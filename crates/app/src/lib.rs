//! Barberbook application layer: the database adapter, query builder, auth
//! providers and the hosted-backend client.

pub mod auth;
pub mod config;
pub mod database;
pub mod datasource;
pub mod errors;
pub mod observability;
pub mod query;
pub mod remote;

#[cfg(test)]
mod test;

pub use database::{Database, migrate};
pub use errors::DataError;
pub use query::QueryBuilder;
