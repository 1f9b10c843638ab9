//! SQLite store - sqlx-backed adapter
//!
//! Decimals are persisted as TEXT and timestamps as RFC 3339 TEXT. The
//! schema is created by an idempotent `init`; the UNIQUE constraint on
//! `pools.year` backs the one-pool-per-year rule at the storage level.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use fueleu_core::{BankEntry, ComplianceRecord, Pool, PoolId, PoolMember, Route, ShipId, Year};

use crate::contract::{Store, StoreTx};
use crate::error::{StoreError, StoreResult};

/// SQLite-backed store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&db_url).await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create the schema if it does not exist yet.
    async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS compliance_records (
                ship_id INTEGER NOT NULL,
                year INTEGER NOT NULL,
                cb_gco2eq TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (ship_id, year)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bank_entries (
                ship_id INTEGER NOT NULL,
                year INTEGER NOT NULL,
                amount_gco2eq TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (ship_id, year)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pool_members (
                pool_id INTEGER NOT NULL,
                ship_id INTEGER NOT NULL,
                cb_before TEXT NOT NULL,
                cb_after TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (pool_id, ship_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS routes (
                route_id TEXT PRIMARY KEY,
                year INTEGER NOT NULL,
                ghg_intensity TEXT NOT NULL,
                is_baseline INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("sqlite schema initialized");
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> StoreResult<SqliteTx> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTx { tx })
    }
}

/// One sqlx transaction against the SQLite store.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

fn parse_decimal(raw: &str, what: &str) -> StoreResult<Decimal> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{}: not a decimal: '{}'", what, raw)))
}

fn parse_timestamp(raw: &str, what: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("{}: not an RFC 3339 timestamp: '{}'", what, raw)))
}

fn compliance_from_row(row: &SqliteRow) -> StoreResult<ComplianceRecord> {
    let cb: String = row.get("cb_gco2eq");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");
    Ok(ComplianceRecord {
        ship_id: ShipId::new_unchecked(row.get("ship_id")),
        year: Year::new_unchecked(row.get("year")),
        cb_gco2eq: parse_decimal(&cb, "compliance_records.cb_gco2eq")?,
        created_at: parse_timestamp(&created, "compliance_records.created_at")?,
        updated_at: parse_timestamp(&updated, "compliance_records.updated_at")?,
    })
}

fn bank_from_row(row: &SqliteRow) -> StoreResult<BankEntry> {
    let amount: String = row.get("amount_gco2eq");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");
    Ok(BankEntry {
        ship_id: ShipId::new_unchecked(row.get("ship_id")),
        year: Year::new_unchecked(row.get("year")),
        amount_gco2eq: parse_decimal(&amount, "bank_entries.amount_gco2eq")?,
        created_at: parse_timestamp(&created, "bank_entries.created_at")?,
        updated_at: parse_timestamp(&updated, "bank_entries.updated_at")?,
    })
}

fn pool_from_row(row: &SqliteRow) -> StoreResult<Pool> {
    let created: String = row.get("created_at");
    Ok(Pool {
        id: PoolId(row.get("id")),
        year: Year::new_unchecked(row.get("year")),
        created_at: parse_timestamp(&created, "pools.created_at")?,
    })
}

fn member_from_row(row: &SqliteRow) -> StoreResult<PoolMember> {
    let before: String = row.get("cb_before");
    let after: String = row.get("cb_after");
    let created: String = row.get("created_at");
    Ok(PoolMember {
        pool_id: PoolId(row.get("pool_id")),
        ship_id: ShipId::new_unchecked(row.get("ship_id")),
        cb_before: parse_decimal(&before, "pool_members.cb_before")?,
        cb_after: parse_decimal(&after, "pool_members.cb_after")?,
        created_at: parse_timestamp(&created, "pool_members.created_at")?,
    })
}

fn route_from_row(row: &SqliteRow) -> StoreResult<Route> {
    let intensity: String = row.get("ghg_intensity");
    let created: String = row.get("created_at");
    Ok(Route {
        route_id: row.get("route_id"),
        year: Year::new_unchecked(row.get("year")),
        ghg_intensity: parse_decimal(&intensity, "routes.ghg_intensity")?,
        is_baseline: row.get::<i64, _>("is_baseline") != 0,
        created_at: parse_timestamp(&created, "routes.created_at")?,
    })
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn find_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
    ) -> StoreResult<Option<ComplianceRecord>> {
        let row = sqlx::query("SELECT * FROM compliance_records WHERE ship_id = ? AND year = ?")
            .bind(ship.value())
            .bind(year.value())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| compliance_from_row(&r)).transpose()
    }

    async fn compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<ComplianceRecord>> {
        let rows =
            sqlx::query("SELECT * FROM compliance_records WHERE ship_id = ? ORDER BY year ASC")
                .bind(ship.value())
                .fetch_all(&mut *self.tx)
                .await?;
        rows.iter().map(compliance_from_row).collect()
    }

    async fn compliance_for_year(&mut self, year: Year) -> StoreResult<Vec<ComplianceRecord>> {
        let rows =
            sqlx::query("SELECT * FROM compliance_records WHERE year = ? ORDER BY ship_id ASC")
                .bind(year.value())
                .fetch_all(&mut *self.tx)
                .await?;
        rows.iter().map(compliance_from_row).collect()
    }

    async fn create_compliance(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord> {
        let record = ComplianceRecord::new(ship, year, cb_gco2eq);
        sqlx::query(
            r#"
            INSERT INTO compliance_records (ship_id, year, cb_gco2eq, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ship.value())
        .bind(year.value())
        .bind(cb_gco2eq.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey(
                format!("compliance record for ship {} year {}", ship, year),
            ),
            _ => StoreError::Database(e),
        })?;
        Ok(record)
    }

    async fn update_compliance_cb(
        &mut self,
        ship: ShipId,
        year: Year,
        cb_gco2eq: Decimal,
    ) -> StoreResult<ComplianceRecord> {
        let updated_at = Utc::now();
        let result = sqlx::query(
            "UPDATE compliance_records SET cb_gco2eq = ?, updated_at = ? WHERE ship_id = ? AND year = ?",
        )
        .bind(cb_gco2eq.to_string())
        .bind(updated_at.to_rfc3339())
        .bind(ship.value())
        .bind(year.value())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow(format!(
                "compliance record for ship {} year {}",
                ship, year
            )));
        }
        self.find_compliance(ship, year).await?.ok_or_else(|| {
            StoreError::MissingRow(format!("compliance record for ship {} year {}", ship, year))
        })
    }

    async fn delete_compliance_for_ship(&mut self, ship: ShipId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM compliance_records WHERE ship_id = ?")
            .bind(ship.value())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_bank_entry(
        &mut self,
        ship: ShipId,
        year: Year,
    ) -> StoreResult<Option<BankEntry>> {
        let row = sqlx::query("SELECT * FROM bank_entries WHERE ship_id = ? AND year = ?")
            .bind(ship.value())
            .bind(year.value())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| bank_from_row(&r)).transpose()
    }

    async fn bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<Vec<BankEntry>> {
        let rows = sqlx::query("SELECT * FROM bank_entries WHERE ship_id = ? ORDER BY year ASC")
            .bind(ship.value())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(bank_from_row).collect()
    }

    async fn create_bank_entry(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry> {
        let entry = BankEntry::new(ship, year, amount_gco2eq);
        sqlx::query(
            r#"
            INSERT INTO bank_entries (ship_id, year, amount_gco2eq, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ship.value())
        .bind(year.value())
        .bind(amount_gco2eq.to_string())
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.updated_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(format!("bank entry for ship {} year {}", ship, year))
            }
            _ => StoreError::Database(e),
        })?;
        Ok(entry)
    }

    async fn update_bank_amount(
        &mut self,
        ship: ShipId,
        year: Year,
        amount_gco2eq: Decimal,
    ) -> StoreResult<BankEntry> {
        let updated_at = Utc::now();
        let result = sqlx::query(
            "UPDATE bank_entries SET amount_gco2eq = ?, updated_at = ? WHERE ship_id = ? AND year = ?",
        )
        .bind(amount_gco2eq.to_string())
        .bind(updated_at.to_rfc3339())
        .bind(ship.value())
        .bind(year.value())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow(format!(
                "bank entry for ship {} year {}",
                ship, year
            )));
        }
        self.find_bank_entry(ship, year).await?.ok_or_else(|| {
            StoreError::MissingRow(format!("bank entry for ship {} year {}", ship, year))
        })
    }

    async fn delete_bank_entries_for_ship(&mut self, ship: ShipId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM bank_entries WHERE ship_id = ?")
            .bind(ship.value())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_pool(&mut self, year: Year) -> StoreResult<Pool> {
        let created_at = Utc::now();
        let result = sqlx::query("INSERT INTO pools (year, created_at) VALUES (?, ?)")
            .bind(year.value())
            .bind(created_at.to_rfc3339())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicateKey(format!("pool for year {}", year))
                }
                _ => StoreError::Database(e),
            })?;
        Ok(Pool {
            id: PoolId(result.last_insert_rowid()),
            year,
            created_at,
        })
    }

    async fn find_pool_by_year(&mut self, year: Year) -> StoreResult<Option<Pool>> {
        let row = sqlx::query("SELECT * FROM pools WHERE year = ?")
            .bind(year.value())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| pool_from_row(&r)).transpose()
    }

    async fn list_pools(&mut self, year: Option<Year>) -> StoreResult<Vec<Pool>> {
        let rows = match year {
            Some(y) => {
                sqlx::query("SELECT * FROM pools WHERE year = ? ORDER BY id ASC")
                    .bind(y.value())
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM pools ORDER BY id ASC")
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        rows.iter().map(pool_from_row).collect()
    }

    async fn insert_pool_members(&mut self, members: &[PoolMember]) -> StoreResult<()> {
        for member in members {
            sqlx::query(
                r#"
                INSERT INTO pool_members (pool_id, ship_id, cb_before, cb_after, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(member.pool_id.value())
            .bind(member.ship_id.value())
            .bind(member.cb_before.to_string())
            .bind(member.cb_after.to_string())
            .bind(member.created_at.to_rfc3339())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn members_for_pool(&mut self, pool: PoolId) -> StoreResult<Vec<PoolMember>> {
        let rows = sqlx::query("SELECT * FROM pool_members WHERE pool_id = ? ORDER BY ship_id ASC")
            .bind(pool.value())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(member_from_row).collect()
    }

    async fn list_routes(&mut self) -> StoreResult<Vec<Route>> {
        let rows = sqlx::query("SELECT * FROM routes ORDER BY route_id ASC")
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(route_from_row).collect()
    }

    async fn find_route(&mut self, route_id: &str) -> StoreResult<Option<Route>> {
        let row = sqlx::query("SELECT * FROM routes WHERE route_id = ?")
            .bind(route_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| route_from_row(&r)).transpose()
    }

    async fn create_route(&mut self, route: &Route) -> StoreResult<Route> {
        sqlx::query(
            r#"
            INSERT INTO routes (route_id, year, ghg_intensity, is_baseline, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&route.route_id)
        .bind(route.year.value())
        .bind(route.ghg_intensity.to_string())
        .bind(route.is_baseline as i64)
        .bind(route.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(format!("route {}", route.route_id))
            }
            _ => StoreError::Database(e),
        })?;
        Ok(route.clone())
    }

    async fn set_baseline(&mut self, route_id: &str) -> StoreResult<Route> {
        sqlx::query("UPDATE routes SET is_baseline = 0 WHERE is_baseline = 1")
            .execute(&mut *self.tx)
            .await?;

        let result = sqlx::query("UPDATE routes SET is_baseline = 1 WHERE route_id = ?")
            .bind(route_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow(format!("route {}", route_id)));
        }
        self.find_route(route_id)
            .await?
            .ok_or_else(|| StoreError::MissingRow(format!("route {}", route_id)))
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
