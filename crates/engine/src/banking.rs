//! Banked-surplus ledger with FIFO consumption
//!
//! Surplus CB banked in one year can be applied against a later year's
//! deficit. Consumption draws down the oldest banked year first and never
//! drives an entry below zero. The drawdown and the target-year credit
//! are one atomic unit of work; banked CB is never destroyed without
//! being credited.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fueleu_core::{BankEntry, ShipId, Year};
use fueleu_store::{Store, StoreTx};

use crate::config::{EngineConfig, ShortfallPolicy};
use crate::error::{EngineError, EngineResult};

/// Outcome of a surplus application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedSurplus {
    /// Amount actually deducted from bank entries and credited to the target year.
    pub applied: Decimal,
    /// Shortfall that available surplus could not cover (zero when fully covered).
    pub remaining: Decimal,
}

/// Manages per-ship, per-year banked surplus.
pub struct BankLedger<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> BankLedger<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Bank a surplus for (ship, year), accumulating onto an existing
    /// entry for the key if one exists.
    pub async fn bank_surplus(
        &self,
        ship_id: ShipId,
        year: Year,
        amount: Decimal,
    ) -> EngineResult<BankEntry> {
        if amount <= self.config.banking_min_surplus_threshold {
            return Err(EngineError::Validation(format!(
                "Banked amount must exceed the minimum surplus threshold ({})",
                self.config.banking_min_surplus_threshold
            )));
        }

        let mut tx = self.store.begin().await?;
        let entry = match tx.find_bank_entry(ship_id, year).await? {
            Some(existing) => {
                let total = existing.amount_gco2eq.checked_add(amount).ok_or_else(|| {
                    EngineError::Validation("Banked total is out of range".to_string())
                })?;
                tx.update_bank_amount(ship_id, year, total).await?
            }
            None => tx.create_bank_entry(ship_id, year, amount).await?,
        };
        tx.commit().await?;

        info!(ship = %ship_id, year = %year, amount = %amount, total = %entry.amount_gco2eq, "banked surplus");
        Ok(entry)
    }

    /// Apply banked surplus against the target year's CB, oldest banked
    /// year first (FIFO).
    ///
    /// The target year's compliance record must exist; this is checked
    /// before any entry is mutated, so ledger consumption can never be
    /// lost to a missing credit target. Under `ShortfallPolicy::Reject`
    /// a request exceeding the available surplus fails with
    /// `InsufficientBalance` and mutates nothing; under `Partial` (the
    /// default) the available amount is applied and the shortfall is
    /// returned as `remaining`.
    pub async fn apply_banked_surplus(
        &self,
        ship_id: ShipId,
        target_year: Year,
        apply_amount: Decimal,
    ) -> EngineResult<AppliedSurplus> {
        if apply_amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "Apply amount must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;

        // Credit target first: NotFound before any entry mutation.
        let target = tx.find_compliance(ship_id, target_year).await?.ok_or_else(|| {
            EngineError::NotFound(format!(
                "compliance record for ship {} year {}",
                ship_id, target_year
            ))
        })?;

        let mut entries = tx.bank_entries_for_ship(ship_id).await?;
        // FIFO: oldest banked year first. The engine owns this invariant.
        entries.sort_by_key(|e| e.year);

        let available: Decimal = entries
            .iter()
            .filter(|e| e.amount_gco2eq > Decimal::ZERO)
            .map(|e| e.amount_gco2eq)
            .sum();

        if self.config.shortfall_policy == ShortfallPolicy::Reject && available < apply_amount {
            return Err(EngineError::InsufficientBalance {
                requested: apply_amount,
                available,
            });
        }

        let mut remaining = apply_amount;
        for entry in &entries {
            if remaining <= Decimal::ZERO {
                break;
            }
            // Non-positive lines never contribute and are never driven lower.
            if entry.amount_gco2eq <= Decimal::ZERO {
                continue;
            }

            let deduction = entry.amount_gco2eq.min(remaining);
            tx.update_bank_amount(ship_id, entry.year, entry.amount_gco2eq - deduction)
                .await?;
            remaining -= deduction;
        }

        let applied = apply_amount - remaining;
        if applied > Decimal::ZERO {
            // An out-of-range credit drops the transaction uncommitted, so
            // the drawdown above is rolled back with it.
            let credited = target.cb_gco2eq.checked_add(applied).ok_or_else(|| {
                EngineError::Validation("Credited compliance balance is out of range".to_string())
            })?;
            tx.update_compliance_cb(ship_id, target_year, credited).await?;
        }
        tx.commit().await?;

        if remaining > Decimal::ZERO {
            warn!(ship = %ship_id, target_year = %target_year, requested = %apply_amount, applied = %applied, shortfall = %remaining, "banked surplus shortfall");
        } else {
            info!(ship = %ship_id, target_year = %target_year, applied = %applied, "applied banked surplus");
        }

        Ok(AppliedSurplus { applied, remaining })
    }

    /// Net position across ALL entries for the ship, negative lines included.
    pub async fn total_surplus(&self, ship_id: ShipId) -> EngineResult<Decimal> {
        let mut tx = self.store.begin().await?;
        let entries = tx.bank_entries_for_ship(ship_id).await?;
        tx.commit().await?;
        Ok(entries.iter().map(|e| e.amount_gco2eq).sum())
    }

    /// All entries for a ship, year ascending.
    pub async fn entries_for_ship(&self, ship_id: ShipId) -> EngineResult<Vec<BankEntry>> {
        let mut tx = self.store.begin().await?;
        let entries = tx.bank_entries_for_ship(ship_id).await?;
        tx.commit().await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueleu_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn ship(id: i64) -> ShipId {
        ShipId::new(id).unwrap()
    }

    fn year(y: i32) -> Year {
        Year::new(y).unwrap()
    }

    async fn ledger_with_entries(
        config: EngineConfig,
    ) -> (BankLedger<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_compliance(ship(1), year(2025), dec!(-1000)).await.unwrap();
        tx.create_bank_entry(ship(1), year(2023), dec!(500)).await.unwrap();
        tx.create_bank_entry(ship(1), year(2024), dec!(300)).await.unwrap();
        tx.commit().await.unwrap();
        (BankLedger::new(Arc::clone(&store), config), store)
    }

    async fn entry_amount(store: &MemoryStore, y: i32) -> Decimal {
        let mut tx = store.begin().await.unwrap();
        tx.find_bank_entry(ship(1), year(y))
            .await
            .unwrap()
            .unwrap()
            .amount_gco2eq
    }

    async fn target_cb(store: &MemoryStore) -> Decimal {
        let mut tx = store.begin().await.unwrap();
        tx.find_compliance(ship(1), year(2025))
            .await
            .unwrap()
            .unwrap()
            .cb_gco2eq
    }

    #[tokio::test]
    async fn test_bank_surplus_creates_then_accumulates() {
        let store = Arc::new(MemoryStore::new());
        let ledger = BankLedger::new(Arc::clone(&store), EngineConfig::default());

        let first = ledger.bank_surplus(ship(1), year(2023), dec!(200)).await.unwrap();
        assert_eq!(first.amount_gco2eq, dec!(200));

        let second = ledger.bank_surplus(ship(1), year(2023), dec!(50)).await.unwrap();
        assert_eq!(second.amount_gco2eq, dec!(250));

        let entries = ledger.entries_for_ship(ship(1)).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_bank_surplus_rejects_at_or_below_threshold() {
        let store = Arc::new(MemoryStore::new());
        let ledger = BankLedger::new(store, EngineConfig::default());

        let result = ledger.bank_surplus(ship(1), year(2023), dec!(0)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        let result = ledger.bank_surplus(ship(1), year(2023), dec!(-5)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bank_surplus_out_of_range_total_returns_error() {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_bank_entry(ship(1), year(2023), Decimal::MAX).await.unwrap();
        tx.commit().await.unwrap();

        let ledger = BankLedger::new(Arc::clone(&store), EngineConfig::default());
        let result = ledger.bank_surplus(ship(1), year(2023), dec!(1)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        assert_eq!(entry_amount(&store, 2023).await, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_apply_out_of_range_credit_rolls_back_drawdown() {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_compliance(ship(1), year(2025), Decimal::MAX).await.unwrap();
        tx.create_bank_entry(ship(1), year(2023), dec!(100)).await.unwrap();
        tx.commit().await.unwrap();

        let ledger = BankLedger::new(Arc::clone(&store), EngineConfig::default());
        let result = ledger.apply_banked_surplus(ship(1), year(2025), dec!(100)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        // Drawdown was rolled back with the failed credit
        assert_eq!(entry_amount(&store, 2023).await, dec!(100));
        assert_eq!(target_cb(&store).await, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_fifo_partial_drawdown() {
        let (ledger, store) = ledger_with_entries(EngineConfig::default()).await;

        let result = ledger
            .apply_banked_surplus(ship(1), year(2025), dec!(400))
            .await
            .unwrap();
        assert_eq!(result.applied, dec!(400));
        assert_eq!(result.remaining, Decimal::ZERO);

        // 2023 entry reduced to 100, 2024 untouched
        assert_eq!(entry_amount(&store, 2023).await, dec!(100));
        assert_eq!(entry_amount(&store, 2024).await, dec!(300));
        assert_eq!(target_cb(&store).await, dec!(-600));
    }

    #[tokio::test]
    async fn test_fifo_spills_into_next_year() {
        let (ledger, store) = ledger_with_entries(EngineConfig::default()).await;

        let result = ledger
            .apply_banked_surplus(ship(1), year(2025), dec!(600))
            .await
            .unwrap();
        assert_eq!(result.applied, dec!(600));

        assert_eq!(entry_amount(&store, 2023).await, Decimal::ZERO);
        assert_eq!(entry_amount(&store, 2024).await, dec!(200));
        assert_eq!(target_cb(&store).await, dec!(-400));
    }

    #[tokio::test]
    async fn test_over_application_partial_policy() {
        let (ledger, store) = ledger_with_entries(EngineConfig::default()).await;

        let result = ledger
            .apply_banked_surplus(ship(1), year(2025), dec!(1000))
            .await
            .unwrap();
        assert_eq!(result.applied, dec!(800));
        assert_eq!(result.remaining, dec!(200));

        // All entries clamp at zero, never negative
        assert_eq!(entry_amount(&store, 2023).await, Decimal::ZERO);
        assert_eq!(entry_amount(&store, 2024).await, Decimal::ZERO);
        assert_eq!(target_cb(&store).await, dec!(-200));
    }

    #[tokio::test]
    async fn test_over_application_reject_policy_mutates_nothing() {
        let config = EngineConfig {
            shortfall_policy: ShortfallPolicy::Reject,
            ..EngineConfig::default()
        };
        let (ledger, store) = ledger_with_entries(config).await;

        let result = ledger.apply_banked_surplus(ship(1), year(2025), dec!(1000)).await;
        match result {
            Err(EngineError::InsufficientBalance { requested, available }) => {
                assert_eq!(requested, dec!(1000));
                assert_eq!(available, dec!(800));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }

        assert_eq!(entry_amount(&store, 2023).await, dec!(500));
        assert_eq!(entry_amount(&store, 2024).await, dec!(300));
        assert_eq!(target_cb(&store).await, dec!(-1000));
    }

    #[tokio::test]
    async fn test_missing_target_checked_before_mutation() {
        let (ledger, store) = ledger_with_entries(EngineConfig::default()).await;

        let result = ledger.apply_banked_surplus(ship(1), year(2030), dec!(100)).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));

        // No entry was touched
        assert_eq!(entry_amount(&store, 2023).await, dec!(500));
        assert_eq!(entry_amount(&store, 2024).await, dec!(300));
    }

    #[tokio::test]
    async fn test_non_positive_entries_skipped() {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_compliance(ship(1), year(2025), dec!(0)).await.unwrap();
        tx.create_bank_entry(ship(1), year(2022), dec!(-100)).await.unwrap();
        tx.create_bank_entry(ship(1), year(2023), dec!(150)).await.unwrap();
        tx.commit().await.unwrap();

        let ledger = BankLedger::new(Arc::clone(&store), EngineConfig::default());
        let result = ledger
            .apply_banked_surplus(ship(1), year(2025), dec!(100))
            .await
            .unwrap();
        assert_eq!(result.applied, dec!(100));

        // Negative line untouched, positive line reduced
        let mut tx = store.begin().await.unwrap();
        let neg = tx.find_bank_entry(ship(1), year(2022)).await.unwrap().unwrap();
        assert_eq!(neg.amount_gco2eq, dec!(-100));
        let pos = tx.find_bank_entry(ship(1), year(2023)).await.unwrap().unwrap();
        assert_eq!(pos.amount_gco2eq, dec!(50));
    }

    #[tokio::test]
    async fn test_apply_rejects_non_positive_amount() {
        let (ledger, _) = ledger_with_entries(EngineConfig::default()).await;

        let result = ledger.apply_banked_surplus(ship(1), year(2025), dec!(0)).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_total_surplus_is_net_position() {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_bank_entry(ship(1), year(2022), dec!(-100)).await.unwrap();
        tx.create_bank_entry(ship(1), year(2023), dec!(500)).await.unwrap();
        tx.commit().await.unwrap();

        let ledger = BankLedger::new(store, EngineConfig::default());
        assert_eq!(ledger.total_surplus(ship(1)).await.unwrap(), dec!(400));
    }
}
