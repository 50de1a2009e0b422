//! stateboard-store: the entity store adapter.
//!
//! [`KeyValueStore`] is the fixed contract the service needs from its
//! persistence layer: get, put, delete, and list-by-prefix with a
//! continuation cursor. [`RedbStore`] implements it over
//! [redb](https://docs.rs/redb) with on-disk and in-memory backends.
//!
//! [`EntityStore`] layers JSON encoding and the write-time timestamp
//! rules on top of any `KeyValueStore`. It is `Clone` + `Send` + `Sync`
//! (backed by `Arc<dyn KeyValueStore>`) and can be shared across tasks.

pub mod contract;
pub mod entities;
pub mod error;
pub mod store;
pub mod tables;

pub use contract::{KeyValueStore, ListPage};
pub use entities::{EntityPage, EntityStore};
pub use error::{StoreError, StoreResult};
pub use store::RedbStore;
