//! The key-value contract every backend implements.
//!
//! Values are opaque bytes. Keys are ordered, so `list` walks a prefix in
//! lexicographic order and hands back an opaque cursor when the page is
//! full and more keys remain.

use crate::error::{StoreError, StoreResult};

/// One page of keys from a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Present only when more keys match beyond this page.
    pub cursor: Option<String>,
}

/// get / put / delete / list-by-prefix over an external store.
///
/// Implementations must be shareable across request tasks. No method
/// retries; failures surface to the caller unchanged.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or replace the value at `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Returns true if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Up to `limit` keys starting with `prefix`, resuming after `cursor`.
    fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> StoreResult<ListPage>;

    /// Fetch several keys at once, skipping any that have disappeared.
    ///
    /// The default is one `get` per key; backends with a cheaper bulk read
    /// should override it.
    fn get_many(&self, keys: &[String]) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.push((key.clone(), value));
            }
        }
        Ok(found)
    }
}

/// Encode the last key of a page as a continuation token.
pub fn encode_cursor(last_key: &str) -> String {
    hex::encode(last_key.as_bytes())
}

/// Recover the last key from a continuation token.
pub fn decode_cursor(cursor: &str) -> StoreResult<String> {
    let bytes = hex::decode(cursor).map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
}
