//! RedbStore: redb-backed implementation of [`KeyValueStore`].
//!
//! A single `entities` table with `&str` keys and `&[u8]` values. Supports
//! both on-disk and in-memory backends (the latter for testing).

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase};
use tracing::debug;

use crate::contract::{KeyValueStore, ListPage, decode_cursor, encode_cursor};
use crate::error::{StoreError, StoreResult};
use crate::tables::ENTITIES;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe key-value store backed by redb.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "entity store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory entity store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ENTITIES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ENTITIES).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ENTITIES).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = value.len(), "value stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(ENTITIES).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "value deleted");
        Ok(existed)
    }

    fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> StoreResult<ListPage> {
        let after = cursor.map(decode_cursor).transpose()?;
        // Resume strictly after the cursor key, unless it sorts before the prefix.
        let start = match after.as_deref() {
            Some(last) if last >= prefix => Bound::Excluded(last),
            _ => Bound::Included(prefix),
        };
        let range: (Bound<&str>, Bound<&str>) = (start, Bound::Unbounded);

        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ENTITIES).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        let mut more = false;
        for entry in table.range::<&str>(range).map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            if keys.len() >= limit {
                more = true;
                break;
            }
            keys.push(key.to_string());
        }

        let cursor = if more {
            keys.last().map(|k| encode_cursor(k))
        } else {
            None
        };
        debug!(%prefix, count = keys.len(), more, "keys listed");
        Ok(ListPage { keys, cursor })
    }

    /// All keys are read inside one transaction.
    fn get_many(&self, keys: &[String]) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ENTITIES).map_err(map_err!(Table))?;
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(guard) = table.get(key.as_str()).map_err(map_err!(Read))? {
                found.push((key.clone(), guard.value().to_vec()));
            }
        }
        Ok(found)
    }
}
