//! Compliance Balance calculation and adjustment
//!
//! CB (gCO2eq) = (target intensity − actual intensity) × energy in scope,
//! where energy in scope = fuel consumption (tons) × energy factor (MJ/ton).
//! Positive CB is a surplus against the target, negative a deficit.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use fueleu_core::{ComplianceRecord, ShipId, Year};
use fueleu_store::{Store, StoreTx};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Computes and adjusts per-ship, per-year Compliance Balances.
pub struct ComplianceCalculator<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> ComplianceCalculator<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Compute and persist the CB for (ship, year).
    ///
    /// Re-computation for an existing key overwrites the stored value in
    /// place: the key is unique and a recomputation means corrected fuel
    /// data for the same reporting period.
    pub async fn compute_cb(
        &self,
        ship_id: ShipId,
        year: Year,
        fuel_consumption_tons: Decimal,
        actual_intensity: Decimal,
    ) -> EngineResult<ComplianceRecord> {
        if fuel_consumption_tons <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "Fuel consumption must be greater than zero".to_string(),
            ));
        }
        if actual_intensity <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "Actual intensity must be greater than zero".to_string(),
            ));
        }

        let energy_in_scope = fuel_consumption_tons
            .checked_mul(self.config.energy_factor_mj_per_ton)
            .ok_or_else(|| {
                EngineError::Validation("Energy in scope is out of range".to_string())
            })?;
        let cb_gco2eq = (self.config.target_intensity_gco2e_per_mj - actual_intensity)
            .checked_mul(energy_in_scope)
            .ok_or_else(|| {
                EngineError::Validation("Compliance balance is out of range".to_string())
            })?;

        let mut tx = self.store.begin().await?;
        let record = match tx.find_compliance(ship_id, year).await? {
            Some(_) => tx.update_compliance_cb(ship_id, year, cb_gco2eq).await?,
            None => tx.create_compliance(ship_id, year, cb_gco2eq).await?,
        };
        tx.commit().await?;

        info!(ship = %ship_id, year = %year, cb = %cb_gco2eq, "computed compliance balance");
        Ok(record)
    }

    /// Apply an additive adjustment to an existing record.
    pub async fn adjust_cb(
        &self,
        ship_id: ShipId,
        year: Year,
        delta: Decimal,
    ) -> EngineResult<ComplianceRecord> {
        let mut tx = self.store.begin().await?;
        let record = tx.find_compliance(ship_id, year).await?.ok_or_else(|| {
            EngineError::NotFound(format!(
                "compliance record for ship {} year {}",
                ship_id, year
            ))
        })?;

        let adjusted = record.cb_gco2eq.checked_add(delta).ok_or_else(|| {
            EngineError::Validation("Adjusted compliance balance is out of range".to_string())
        })?;
        let updated = tx.update_compliance_cb(ship_id, year, adjusted).await?;
        tx.commit().await?;

        info!(ship = %ship_id, year = %year, delta = %delta, cb = %updated.cb_gco2eq, "adjusted compliance balance");
        Ok(updated)
    }

    /// The record for (ship, year), if any.
    pub async fn record_for(
        &self,
        ship_id: ShipId,
        year: Year,
    ) -> EngineResult<Option<ComplianceRecord>> {
        let mut tx = self.store.begin().await?;
        let record = tx.find_compliance(ship_id, year).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// All records for a ship, year ascending.
    pub async fn history(&self, ship_id: ShipId) -> EngineResult<Vec<ComplianceRecord>> {
        let mut tx = self.store.begin().await?;
        let records = tx.compliance_for_ship(ship_id).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Delete a ship's compliance records and bank entries in one
    /// transaction. Returns the number of rows removed.
    pub async fn purge_ship(&self, ship_id: ShipId) -> EngineResult<u64> {
        let mut tx = self.store.begin().await?;
        let compliance = tx.delete_compliance_for_ship(ship_id).await?;
        let bank = tx.delete_bank_entries_for_ship(ship_id).await?;
        tx.commit().await?;

        info!(ship = %ship_id, rows = compliance + bank, "purged ship");
        Ok(compliance + bank)
    }
}
