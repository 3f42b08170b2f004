//! Store backends
//!
//! This module provides the implementations of the [`Store`] trait and a
//! factory that selects one at startup:
//!
//! - [`MemoryStore`]: `DashMap`-backed, non-durable
//! - [`SqliteStore`]: `rusqlite`-backed, durable, with bounded retries

use crate::cli::StoreType;
use crate::core::Store;
use crate::types::StoreError;
use std::path::Path;
use std::sync::Arc;

pub mod memory;
pub mod retry;
pub mod sqlite;

pub use memory::MemoryStore;
pub use retry::RetryPolicy;
pub use sqlite::SqliteStore;

/// Create a store based on the specified store type
///
/// # Arguments
///
/// * `store_type` - Which backend to open
/// * `database` - Database file path (ignored for the memory store)
/// * `retry` - Retry budget for transient failures (ignored for the memory store)
///
/// # Errors
///
/// Returns `StoreError::Unavailable` if the SQLite database cannot be opened.
pub fn create_store(
    store_type: StoreType,
    database: &Path,
    retry: RetryPolicy,
) -> Result<Arc<dyn Store>, StoreError> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreType::Sqlite => Ok(Arc::new(SqliteStore::open(database, retry)?)),
    }
}
