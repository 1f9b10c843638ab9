//! Store contracts - the engine's only view of persistence
//!
//! `Store::begin` opens a `StoreTx`: one atomic unit of work spanning all
//! entity families, so a multi-row operation (FIFO drawdown plus its
//! compliance credit, pool settlement) either lands completely or not at
//! all. Dropping a transaction without `commit()` rolls it back.

use async_trait::async_trait;
use rust_decimal::Decimal;

use fueleu_core::{BankEntry, ComplianceRecord, Pool, PoolId, PoolMember, Route, ShipId, Year};

use crate::error::StoreResult;

/// A handle to the persistent store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Begin an atomic unit of work.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One atomic transaction against the store.
///
/// All reads within the transaction observe a stable snapshot; all writes
/// become visible only on `commit()`.
#[async_trait]
pub trait StoreTx: Send {
    // === Compliance records ===

    async fn find_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
    ) -> StoreResult<Option<ComplianceRecord>>;

    /// All records for a ship, year ascending.
    async fn compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<ComplianceRecord>>;

    /// All records for a year, ship id ascending.
    async fn compliance_for_year(&mut self, year: Year) -> StoreResult<Vec<ComplianceRecord>>;

    async fn create_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord>;

    /// In-place CB update. Fails with `MissingRow` if the key is absent.
    async fn update_compliance_cb(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord>;

    /// Returns the number of rows removed.
    async fn delete_compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<u64>;

    // === Bank entries ===

    async fn find_bank_entry(&mut self, ship: ShipId, year: Year)
        -> StoreResult<Option<BankEntry>>;

    /// All entries for a ship, year ascending (FIFO order).
    async fn bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<BankEntry>>;

    async fn create_bank_entry(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry>;

    /// In-place amount update. Fails with `MissingRow` if the key is absent.
    async fn update_bank_amount(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry>;

    /// Returns the number of rows removed.
    async fn delete_bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<u64>;

    // === Pools ===

    /// Insert a pool row; fails with `DuplicateKey` if one exists for `year`.
    async fn create_pool(&mut self, year: Year) -> StoreResult<Pool>;

    async fn find_pool_by_year(&mut self, year: Year) -> StoreResult<Option<Pool>>;

    /// All pools, optionally filtered by year, id ascending.
    async fn list_pools(&mut self, year: Option<Year>) -> StoreResult<Vec<Pool>>;

    async fn insert_pool_members(&mut self, members: &[PoolMember]) -> StoreResult<()>;

    /// Members of a pool, ship id ascending.
    async fn members_for_pool(&mut self, pool: PoolId) -> StoreResult<Vec<PoolMember>>;

    // === Routes ===

    /// All routes, route id ascending.
    async fn list_routes(&mut self) -> StoreResult<Vec<Route>>;

    async fn find_route(&mut self, route_id: &str) -> StoreResult<Option<Route>>;

    async fn create_route(&mut self, route: &Route) -> StoreResult<Route>;

    /// Mark one route as baseline, clearing any previous baseline.
    /// Fails with `MissingRow` if the route is absent.
    async fn set_baseline(&mut self, route_id: &str) -> StoreResult<Route>;

    /// Make all writes in this transaction visible.
    async fn commit(self) -> StoreResult<()>;
}
