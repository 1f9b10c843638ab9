//! Pool redistribution under the conservation invariant
//!
//! A pool groups ships for one reporting year and redistributes CB so
//! deficits are offset by surpluses within the group. Redistribution is
//! greedy: largest donor first, largest need first, which minimizes the
//! number of partial transfers and makes the allocation a deterministic
//! function of the member set (required for reproducible audits).
//!
//! Σ cb_before == Σ cb_after is checked before anything is persisted;
//! a mismatch is an internal defect, not a user-input problem.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use fueleu_core::{Pool, PoolId, PoolMember, ShipId, Year};
use fueleu_store::{Store, StoreTx};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// A member's CB snapshot at pool-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub ship_id: ShipId,
    pub cb_before: Decimal,
}

/// Result of a successful pool creation.
#[derive(Debug, Clone)]
pub struct CreatedPool {
    pub pool: Pool,
    pub members: Vec<PoolMember>,
}

/// Creates pools and settles member CBs atomically.
pub struct PoolAllocator<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> PoolAllocator<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create the pool for `year`, redistribute CB across `members`, and
    /// settle each member ship's compliance record to its cb_after, all
    /// in one store transaction.
    ///
    /// At most one pool may exist per year: the conservation invariant
    /// and the full-replace settlement are only meaningful against a
    /// stable snapshot.
    pub async fn create_pool(
        &self,
        year: Year,
        members: &[MemberSnapshot],
    ) -> EngineResult<CreatedPool> {
        if members.is_empty() {
            return Err(EngineError::InvalidPool(
                "A pool requires at least one member".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for member in members {
            if !seen.insert(member.ship_id) {
                return Err(EngineError::InvalidPool(format!(
                    "Ship {} appears more than once",
                    member.ship_id
                )));
            }
        }

        let total_before: Decimal = members.iter().map(|m| m.cb_before).sum();
        if total_before < self.config.pool_min_total_cb {
            return Err(EngineError::InvalidPool(format!(
                "Total CB {} is below the required minimum {}",
                total_before, self.config.pool_min_total_cb
            )));
        }

        let mut tx = self.store.begin().await?;

        if tx.find_pool_by_year(year).await?.is_some() {
            return Err(EngineError::InvalidPool(format!(
                "A pool already exists for year {}",
                year
            )));
        }

        // Every member must already hold a settled record for the year;
        // checked before any write.
        for member in members {
            if tx.find_compliance(member.ship_id, year).await?.is_none() {
                return Err(EngineError::NotFound(format!(
                    "compliance record for ship {} year {}",
                    member.ship_id, year
                )));
            }
        }

        let settled = redistribute(members);

        let total_after: Decimal = settled.iter().map(|(_, _, after)| *after).sum();
        if (total_after - total_before).abs() > self.config.conservation_epsilon {
            error!(
                year = %year,
                total_before = %total_before,
                total_after = %total_after,
                "conservation invariant violated after redistribution"
            );
            return Err(EngineError::ConservationViolation {
                total_before,
                total_after,
            });
        }

        let pool = tx.create_pool(year).await?;
        let pool_members: Vec<PoolMember> = settled
            .iter()
            .map(|(ship_id, cb_before, cb_after)| PoolMember {
                pool_id: pool.id,
                ship_id: *ship_id,
                cb_before: *cb_before,
                cb_after: *cb_after,
                created_at: pool.created_at,
            })
            .collect();
        tx.insert_pool_members(&pool_members).await?;

        // Settle each member's record: full replace, cb_after already is
        // the settled value for the year.
        for member in &pool_members {
            tx.update_compliance_cb(member.ship_id, year, member.cb_after)
                .await?;
        }
        tx.commit().await?;

        info!(
            pool = %pool.id,
            year = %year,
            members = pool_members.len(),
            total_cb = %total_before,
            "created pool"
        );
        Ok(CreatedPool {
            pool,
            members: pool_members,
        })
    }

    /// All pools, optionally filtered by year.
    pub async fn list_pools(&self, year: Option<Year>) -> EngineResult<Vec<Pool>> {
        let mut tx = self.store.begin().await?;
        let pools = tx.list_pools(year).await?;
        tx.commit().await?;
        Ok(pools)
    }

    /// Member rows of a pool, ship id ascending.
    pub async fn members(&self, pool_id: PoolId) -> EngineResult<Vec<PoolMember>> {
        let mut tx = self.store.begin().await?;
        let members = tx.members_for_pool(pool_id).await?;
        tx.commit().await?;
        Ok(members)
    }
}

/// Greedy surplus-to-deficit transfer.
///
/// Donors are visited largest surplus first, deficits largest need first,
/// ties broken by ship id. Each transfer moves
/// min(donor remaining, deficit need); a donor never falls below zero and
/// a deficit never rises above zero.
fn redistribute(members: &[MemberSnapshot]) -> Vec<(ShipId, Decimal, Decimal)> {
    let mut settled: Vec<(ShipId, Decimal, Decimal)> = members
        .iter()
        .map(|m| (m.ship_id, m.cb_before, m.cb_before))
        .collect();

    let mut donors: Vec<usize> = (0..settled.len())
        .filter(|&i| settled[i].1 > Decimal::ZERO)
        .collect();
    donors.sort_by(|&a, &b| {
        settled[b]
            .1
            .cmp(&settled[a].1)
            .then(settled[a].0.cmp(&settled[b].0))
    });

    let mut deficits: Vec<usize> = (0..settled.len())
        .filter(|&i| settled[i].1 < Decimal::ZERO)
        .collect();
    deficits.sort_by(|&a, &b| {
        settled[a]
            .1
            .cmp(&settled[b].1)
            .then(settled[a].0.cmp(&settled[b].0))
    });

    for &d in &deficits {
        for &s in &donors {
            if settled[d].2 >= Decimal::ZERO {
                break;
            }
            let donor_remaining = settled[s].2;
            if donor_remaining <= Decimal::ZERO {
                continue;
            }

            let need = -settled[d].2;
            let transfer = donor_remaining.min(need);
            settled[s].2 -= transfer;
            settled[d].2 += transfer;
        }
    }

    settled
}
