//! Typed entity access on top of a [`KeyValueStore`].
//!
//! Entities are JSON-encoded into the store's byte values. Every write path
//! (PUT, POST, sync, webhook) funnels through [`EntityStore::upsert`] so the
//! timestamp rules are applied in exactly one place.

use std::sync::Arc;

use stateboard_core::Entity;
use tracing::debug;

use crate::contract::KeyValueStore;
use crate::error::{StoreError, StoreResult};

/// A page of decoded entities.
#[derive(Debug, Clone, Default)]
pub struct EntityPage {
    pub records: Vec<Entity>,
    pub cursor: Option<String>,
}

/// Cheaply cloneable handle shared by all request handlers.
#[derive(Clone)]
pub struct EntityStore {
    kv: Arc<dyn KeyValueStore>,
}

impl EntityStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Access the raw key-value contract.
    pub fn raw(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<Entity>> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Full overwrite at `key`, stamped against whatever is stored there now.
    ///
    /// The read of the previous record and the write are not atomic;
    /// concurrent writers to one key race under last-write-wins.
    pub fn upsert(&self, key: &str, mut entity: Entity, now: u64) -> StoreResult<Entity> {
        let previous = self.get(key)?;
        entity.stamp_write(key, previous.as_ref(), now);
        let bytes = serde_json::to_vec(&entity).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.kv.put(key, &bytes)?;
        debug!(%key, replaced = previous.is_some(), "entity written");
        Ok(entity)
    }

    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.kv.delete(key)
    }

    /// List keys under `prefix`, then fetch their records.
    ///
    /// Keys deleted between the two steps are silently dropped.
    pub fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> StoreResult<EntityPage> {
        let page = self.kv.list(prefix, limit, cursor)?;
        let records = self
            .kv
            .get_many(&page.keys)?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(EntityPage {
            records,
            cursor: page.cursor,
        })
    }

    /// Read up to `cap` entities across all keys.
    pub fn scan(&self, cap: usize) -> StoreResult<Vec<Entity>> {
        Ok(self.list("", cap, None)?.records)
    }
}

fn decode(bytes: &[u8]) -> StoreResult<Entity> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialize(e.to_string()))
}
