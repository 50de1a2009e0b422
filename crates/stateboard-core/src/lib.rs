//! stateboard-core: shared types for Stateboard.
//!
//! The entity record and its `{type}:{id}` key, the canonical status
//! vocabulary, the epoch clock, and the TOML configuration model.

pub mod clock;
pub mod config;
pub mod entity;
pub mod status;

pub use clock::epoch_secs;
pub use config::{ConfigError, StateboardConfig};
pub use entity::{DEFAULT_ENTITY_TYPE, Entity, EntityKey, random_id};
pub use status::CanonicalStatus;
