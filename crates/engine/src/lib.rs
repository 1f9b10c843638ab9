//! FuelEU Engine - Compliance Ledger and Redistribution Engine
//!
//! Four services over the store contracts:
//! - `ComplianceCalculator` - CB computation and additive adjustment
//! - `BankLedger` - banked surplus with FIFO consumption
//! - `PoolAllocator` - pool redistribution under the conservation invariant
//! - `RouteComparator` - baseline comparison reporting
//!
//! All state lives behind the injected `Store`; the services hold no
//! shared mutable state between invocations.

pub mod banking;
pub mod compliance;
pub mod config;
pub mod error;
pub mod pooling;
pub mod routes;

pub use banking::{AppliedSurplus, BankLedger};
pub use compliance::ComplianceCalculator;
pub use config::{EngineConfig, ShortfallPolicy};
pub use error::{EngineError, EngineResult};
pub use pooling::{CreatedPool, MemberSnapshot, PoolAllocator};
pub use routes::{RouteComparator, RouteComparison};
