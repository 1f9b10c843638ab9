//! In-memory store - test double and embedded use
//!
//! Transactions take an owned async mutex guard for their whole lifetime,
//! so units of work are fully serialized. Each transaction works on a
//! clone of the state and publishes it on commit; dropping the
//! transaction discards the clone (rollback).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use fueleu_core::{BankEntry, ComplianceRecord, Pool, PoolId, PoolMember, Route, ShipId, Year};

use crate::contract::{Store, StoreTx};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    compliance: BTreeMap<(i64, i32), ComplianceRecord>,
    bank: BTreeMap<(i64, i32), BankEntry>,
    pools: BTreeMap<i64, Pool>,
    pool_members: Vec<PoolMember>,
    routes: BTreeMap<String, Route>,
    next_pool_id: i64,
}

/// In-memory store backed by a single mutex-guarded state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

/// One serialized unit of work against a `MemoryStore`.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn key(ship: ShipId, year: Year) -> (i64, i32) {
    (ship.value(), year.value())
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
    ) -> StoreResult<Option<ComplianceRecord>> {
        Ok(self.work.compliance.get(&key(ship, year)).cloned())
    }

    async fn compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<ComplianceRecord>> {
        // BTreeMap range over (ship, *) yields year-ascending order
        Ok(self
            .work
            .compliance
            .range((ship.value(), i32::MIN)..=(ship.value(), i32::MAX))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn compliance_for_year(&mut self, year: Year) -> StoreResult<Vec<ComplianceRecord>> {
        Ok(self
            .work
            .compliance
            .values()
            .filter(|r| r.year == year)
            .cloned()
            .collect())
    }

    async fn create_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord> {
        let k = key(ship, year);
        if self.work.compliance.contains_key(&k) {
            return Err(StoreError::DuplicateKey(format!(
                "compliance record for ship {} year {}",
                ship, year
            )));
        }
        let record = ComplianceRecord::new(ship, year, cb_gco2eq);
        self.work.compliance.insert(k, record.clone());
        Ok(record)
    }

    async fn update_compliance_cb(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord> {
        let record = self.work.compliance.get_mut(&key(ship, year)).ok_or_else(|| {
            StoreError::MissingRow(format!("compliance record for ship {} year {}", ship, year))
        })?;
        record.cb_gco2eq = cb_gco2eq;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<u64> {
        let before = self.work.compliance.len();
        self.work.compliance.retain(|(s, _), _| *s != ship.value());
        Ok((before - self.work.compliance.len()) as u64)
    }

    async fn find_bank_entry(
        &mut self,
        ship: ShipId,
        year: Year,
    ) -> StoreResult<Option<BankEntry>> {
        Ok(self.work.bank.get(&key(ship, year)).cloned())
    }

    async fn bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<BankEntry>> {
        Ok(self
            .work
            .bank
            .range((ship.value(), i32::MIN)..=(ship.value(), i32::MAX))
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn create_bank_entry(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry> {
        let k = key(ship, year);
        if self.work.bank.contains_key(&k) {
            return Err(StoreError::DuplicateKey(format!(
                "bank entry for ship {} year {}",
                ship, year
            )));
        }
        let entry = BankEntry::new(ship, year, amount_gco2eq);
        self.work.bank.insert(k, entry.clone());
        Ok(entry)
    }

    async fn update_bank_amount(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry> {
        let entry = self.work.bank.get_mut(&key(ship, year)).ok_or_else(|| {
            StoreError::MissingRow(format!("bank entry for ship {} year {}", ship, year))
        })?;
        entry.amount_gco2eq = amount_gco2eq;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<u64> {
        let before = self.work.bank.len();
        self.work.bank.retain(|(s, _), _| *s != ship.value());
        Ok((before - self.work.bank.len()) as u64)
    }

    async fn create_pool(&mut self, year: Year) -> StoreResult<Pool> {
        if self.work.pools.values().any(|p| p.year == year) {
            return Err(StoreError::DuplicateKey(format!("pool for year {}", year)));
        }
        self.work.next_pool_id += 1;
        let pool = Pool {
            id: PoolId(self.work.next_pool_id),
            year,
            created_at: Utc::now(),
        };
        self.work.pools.insert(pool.id.value(), pool.clone());
        Ok(pool)
    }

    async fn find_pool_by_year(&mut self, year: Year) -> StoreResult<Option<Pool>> {
        Ok(self.work.pools.values().find(|p| p.year == year).cloned())
    }

    async fn list_pools(&mut self, year: Option<Year>) -> StoreResult<Vec<Pool>> {
        Ok(self
            .work
            .pools
            .values()
            .filter(|p| year.map_or(true, |y| p.year == y))
            .cloned()
            .collect())
    }

    async fn insert_pool_members(&mut self, members: &[PoolMember]) -> StoreResult<()> {
        self.work.pool_members.extend_from_slice(members);
        Ok(())
    }

    async fn members_for_pool(&mut self, pool: PoolId) -> StoreResult<Vec<PoolMember>> {
        let mut members: Vec<PoolMember> = self
            .work
            .pool_members
            .iter()
            .filter(|m| m.pool_id == pool)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.ship_id);
        Ok(members)
    }

    async fn list_routes(&mut self) -> StoreResult<Vec<Route>> {
        Ok(self.work.routes.values().cloned().collect())
    }

    async fn find_route(&mut self, route_id: &str) -> StoreResult<Option<Route>> {
        Ok(self.work.routes.get(route_id).cloned())
    }

    async fn create_route(&mut self, route: &Route) -> StoreResult<Route> {
        if self.work.routes.contains_key(&route.route_id) {
            return Err(StoreError::DuplicateKey(format!("route {}", route.route_id)));
        }
        self.work.routes.insert(route.route_id.clone(), route.clone());
        Ok(route.clone())
    }

    async fn set_baseline(&mut self, route_id: &str) -> StoreResult<Route> {
        if !self.work.routes.contains_key(route_id) {
            return Err(StoreError::MissingRow(format!("route {}", route_id)));
        }
        for route in self.work.routes.values_mut() {
            route.is_baseline = route.route_id == route_id;
        }
        Ok(self.work.routes[route_id].clone())
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = self.work;
        Ok(())
    }
}
