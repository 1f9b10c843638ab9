//! FuelEU Core - domain value types and entities
//!
//! Shared by the store adapters and the engine. Contains no I/O.

pub mod entities;
pub mod ids;

pub use entities::{BankEntry, ComplianceRecord, Pool, PoolMember, Route};
pub use ids::{IdError, PoolId, ShipId, Year, MAX_REPORTING_YEAR, MIN_REPORTING_YEAR};
