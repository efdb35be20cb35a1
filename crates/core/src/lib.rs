//! Barberbook Core
//!
//! Local record store for the Barberbook booking platform: key-value
//! persistence, per-table visibility policies, filter expressions, query plans
//! and snapshots.

pub mod context;
pub mod filter;
pub mod ids;
pub mod plan;
pub mod procedures;
pub mod records;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod tables;
