//! Identifier newtypes - validated keys for ledger entities
//!
//! Every persisted row in the compliance ledger is keyed by a ship and/or
//! a reporting year. Malformed keys are rejected at construction, so the
//! engine and stores never see an invalid one.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// First and last reporting year the ledger accepts.
pub const MIN_REPORTING_YEAR: i32 = 2000;
pub const MAX_REPORTING_YEAR: i32 = 2100;

/// Errors that can occur when constructing identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Ship id must be positive: {0}")]
    InvalidShipId(i64),

    #[error("Reporting year out of range [{MIN_REPORTING_YEAR}, {MAX_REPORTING_YEAR}]: {0}")]
    InvalidYear(i32),
}

/// A validated ship identifier.
///
/// # Invariant
/// The inner value is always > 0. This is enforced by the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ShipId(i64);

impl ShipId {
    /// Create a new ShipId from a raw value.
    ///
    /// Returns an error if the value is not strictly positive.
    pub fn new(value: i64) -> Result<Self, IdError> {
        if value <= 0 {
            Err(IdError::InvalidShipId(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create a ShipId without validation.
    ///
    /// # Safety
    /// The caller MUST ensure the value is positive.
    /// Use only for trusted sources (e.g., rows read from validated storage).
    #[inline]
    pub const fn new_unchecked(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner value
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for ShipId {
    type Error = IdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShipId> for i64 {
    fn from(id: ShipId) -> Self {
        id.0
    }
}

/// A validated reporting year.
///
/// # Invariant
/// The inner value lies in [MIN_REPORTING_YEAR, MAX_REPORTING_YEAR].
/// Ordering on `Year` defines the FIFO order of banked-surplus consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Year(i32);

impl Year {
    /// Create a new Year from a raw value.
    ///
    /// Returns an error if the value is outside the accepted range.
    pub fn new(value: i32) -> Result<Self, IdError> {
        if !(MIN_REPORTING_YEAR..=MAX_REPORTING_YEAR).contains(&value) {
            Err(IdError::InvalidYear(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create a Year without validation.
    ///
    /// # Safety
    /// The caller MUST ensure the value lies in the accepted range.
    #[inline]
    pub const fn new_unchecked(value: i32) -> Self {
        Self(value)
    }

    /// Get the inner value
    #[inline]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Year {
    type Error = IdError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> Self {
        year.0
    }
}

/// Store-assigned surrogate key for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub i64);

impl PoolId {
    /// Get the inner value
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
