//! Engine errors
//!
//! Every variant carries a stable kind tag (via strum) so log pipelines
//! and alert routing can match on it without parsing messages. Note that
//! `ConservationViolation` is an internal defect, never a user-input
//! problem; it must be alerted on, not shown as a validation failure.

use rust_decimal::Decimal;
use strum_macros::IntoStaticStr;
use thiserror::Error;

use fueleu_core::IdError;
use fueleu_store::StoreError;

/// Errors from the compliance engine
#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient banked surplus: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid pool: {0}")]
    InvalidPool(String),

    #[error("Conservation invariant violated: total before {total_before}, total after {total_after}")]
    ConservationViolation {
        total_before: Decimal,
        total_after: Decimal,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Stable kind tag for logging and alert routing
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<IdError> for EngineError {
    fn from(err: IdError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
