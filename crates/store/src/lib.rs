//! FuelEU Store - persistence contracts and adapters
//!
//! The engine only ever talks to `Store`/`StoreTx`. Two adapters are
//! provided: `MemoryStore` (test double, embedded use) and `SqliteStore`.

pub mod contract;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use contract::{Store, StoreTx};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
