//! Persistence seam for item records.
//!
//! The engine needs exactly two things from storage: a snapshot of every
//! record, and a single-record flag update that reports whether the code
//! matched anything. Both backends the project has used (a relational
//! database and a flat JSON file) sit behind [`ItemStore`].

pub mod json;
pub mod sqlite;

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::types::ItemRecord;

pub use json::JsonFileStore;
pub use sqlite::{ImportReport, SqliteItemStore};

/// Synchronous store interface. Callers on the async side run these on the
/// blocking pool.
pub trait ItemStore: Send + Sync + 'static {
    /// Every record, in the store's natural order.
    fn list_all(&self) -> Result<Vec<ItemRecord>>;

    /// Set the `active` flag for `code`. Returns `false` when no record has
    /// that code. Each call commits independently.
    fn update_active_flag(&self, code: &str, active: bool) -> Result<bool>;
}

/// Open the backend named by `config`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn ItemStore>> {
    let store: Arc<dyn ItemStore> = match config {
        StoreConfig::Sqlite { path } => Arc::new(SqliteItemStore::open(path)?),
        StoreConfig::Json { path } => Arc::new(JsonFileStore::new(path)),
    };
    tracing::debug!(path = %config.path().display(), "item store opened");
    Ok(store)
}
