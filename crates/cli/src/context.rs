//! Application context - wires everything together

use std::path::Path;
use std::sync::Arc;

use fueleu_engine::{
    BankLedger, ComplianceCalculator, EngineConfig, PoolAllocator, RouteComparator,
};
use fueleu_store::SqliteStore;

/// Application context - the engine services wired to a SQLite store.
///
/// Configuration is read from `<data>/config.json` when present,
/// otherwise the regulatory defaults apply.
pub struct AppContext {
    pub compliance: ComplianceCalculator<SqliteStore>,
    pub banking: BankLedger<SqliteStore>,
    pub pooling: PoolAllocator<SqliteStore>,
    pub routes: RouteComparator<SqliteStore>,
    pub config: EngineConfig,
}

impl AppContext {
    /// Create a new application context rooted at `data_path`.
    pub async fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;

        let config_path = data_path.join("config.json");
        let config = if config_path.exists() {
            EngineConfig::from_file(&config_path)?
        } else {
            EngineConfig::default()
        };

        let db_path = data_path.join("fueleu.db");
        let store = Arc::new(SqliteStore::new(&db_path).await?);

        Ok(Self {
            compliance: ComplianceCalculator::new(Arc::clone(&store), config.clone()),
            banking: BankLedger::new(Arc::clone(&store), config.clone()),
            pooling: PoolAllocator::new(Arc::clone(&store), config.clone()),
            routes: RouteComparator::new(store, config.clone()),
            config,
        })
    }
}
