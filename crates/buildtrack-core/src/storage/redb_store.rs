//! # redb-backed Key-Value Store
//!
//! A disk-backed string store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - Zero configuration
//!
//! Every key lives in one table. `update` runs its read and its write inside
//! the same write transaction.

use super::{Store, UpdateFn};
use crate::TrackError;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for all values: key string -> value string
const KV: TableDefinition<&str, &str> = TableDefinition::new("kv");

fn io_err(e: impl std::fmt::Display) -> TrackError {
    TrackError::Io(e.to_string())
}

/// A durable store backed by a single redb file.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize the table so reads on a fresh file succeed
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(KV).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize, TrackError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(KV).map_err(io_err)?;
        let len = table.len().map_err(io_err)?;
        Ok(len as usize)
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> Result<bool, TrackError> {
        Ok(self.len()? == 0)
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), TrackError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

impl Store for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrackError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(KV).map_err(io_err)?;
        let value = table
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value().to_string());
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), TrackError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(KV).map_err(io_err)?;
            table.insert(key, value).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), TrackError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(KV).map_err(io_err)?;
            table.remove(key).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn update(&mut self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), TrackError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(KV).map_err(io_err)?;
            let current = table
                .get(key)
                .map_err(io_err)?
                .map(|v| v.value().to_string());
            // An error here drops the transaction uncommitted
            let next = apply(current.as_deref())?;
            table.insert(key, next.as_str()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}
