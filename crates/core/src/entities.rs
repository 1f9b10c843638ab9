//! Persisted ledger entities
//!
//! These are the rows the stores read and write: compliance records,
//! bank entries, pools, pool members, and routes. All monetary/CB fields
//! are `Decimal` (gCO2-equivalent); binary floating point is never used.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{PoolId, ShipId, Year};

/// A ship's Compliance Balance for one reporting year.
///
/// Unique per (ship_id, year). Adjustments (banking credits, pool
/// settlement) update the row in place; the key is never recreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub ship_id: ShipId,
    pub year: Year,
    /// Signed CB in gCO2eq: positive = surplus, negative = deficit.
    pub cb_gco2eq: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceRecord {
    /// Create a fresh record stamped with the current time.
    pub fn new(ship_id: ShipId, year: Year, cb_gco2eq: Decimal) -> Self {
        let now = Utc::now();
        Self {
            ship_id,
            year,
            cb_gco2eq,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A signed banked-surplus ledger line.
///
/// Unique per (ship_id, year). Positive = surplus available for FIFO
/// consumption; consumption decrements toward zero, never below it.
/// Deleted only by an explicit ship purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
    pub ship_id: ShipId,
    pub year: Year,
    pub amount_gco2eq: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankEntry {
    /// Create a fresh entry stamped with the current time.
    pub fn new(ship_id: ShipId, year: Year, amount_gco2eq: Decimal) -> Self {
        let now = Utc::now();
        Self {
            ship_id,
            year,
            amount_gco2eq,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A redistribution event for one reporting year.
///
/// At most one pool exists per year; the store enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub year: Year,
    pub created_at: DateTime<Utc>,
}

/// One ship's share of a pool: the CB snapshot at creation time and the
/// settled value after redistribution. Written in bulk at pool creation,
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMember {
    pub pool_id: PoolId,
    pub ship_id: ShipId,
    pub cb_before: Decimal,
    pub cb_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A voyage profile used for baseline comparison reporting.
///
/// At most one route carries `is_baseline` at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub year: Year,
    /// GHG intensity in gCO2e/MJ.
    pub ghg_intensity: Decimal,
    pub is_baseline: bool,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Create a fresh non-baseline route stamped with the current time.
    pub fn new(route_id: impl Into<String>, year: Year, ghg_intensity: Decimal) -> Self {
        Self {
            route_id: route_id.into(),
            year,
            ghg_intensity,
            is_baseline: false,
            created_at: Utc::now(),
        }
    }
}
