//! The entity record and its composite key.
//!
//! An entity is an opaque JSON object. The service reads a handful of
//! reserved fields through accessors and writes only `key`, `created_at`
//! and `updated_at`; every other field is stored and returned exactly as
//! submitted.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type used when a created record names no `entity_type`.
pub const DEFAULT_ENTITY_TYPE: &str = "task";

pub const FIELD_KEY: &str = "key";
pub const FIELD_ENTITY_TYPE: &str = "entity_type";
/// Accepted in place of `entity_type` on input.
pub const FIELD_TYPE_ALIAS: &str = "type";
pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_METADATA: &str = "metadata";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";
pub const FIELD_GITHUB_REF: &str = "github_ref";

/// A stored state record, keyed by `{entity_type}:{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Builder form of [`Entity::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.0
            .get(FIELD_KEY)
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
    }

    /// `entity_type`, else its `type` alias. Numbers are rendered as text.
    pub fn entity_type(&self) -> Option<String> {
        self.text(FIELD_ENTITY_TYPE)
            .or_else(|| self.text(FIELD_TYPE_ALIAS))
    }

    pub fn id(&self) -> Option<String> {
        self.text(FIELD_ID)
    }

    pub fn name(&self) -> Option<String> {
        self.text(FIELD_NAME)
    }

    pub fn status(&self) -> Option<String> {
        self.text(FIELD_STATUS)
    }

    /// Unix seconds of the first write. Fractional values are accepted.
    pub fn created_at(&self) -> Option<f64> {
        self.0.get(FIELD_CREATED_AT).and_then(epoch)
    }

    /// Unix seconds of the latest write. Fractional values are accepted.
    pub fn updated_at(&self) -> Option<f64> {
        self.0.get(FIELD_UPDATED_AT).and_then(epoch)
    }

    /// The grouping type: the entity type if set, else the key's prefix.
    pub fn kind(&self) -> Option<String> {
        self.entity_type().or_else(|| {
            self.key()
                .and_then(|k| k.split_once(':'))
                .map(|(t, _)| t)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    }

    /// The explicit key, or `{type}:{id}` when an id is present.
    ///
    /// `default_type` stands in for a missing or empty entity type.
    pub fn derive_key(&self, default_type: &str) -> Option<String> {
        if let Some(key) = self.key() {
            return Some(key.to_string());
        }
        let id = self.id()?;
        let entity_type = self
            .entity_type()
            .unwrap_or_else(|| default_type.to_string());
        Some(EntityKey::new(entity_type, id).to_string())
    }

    /// Apply the write-time stamps for a record about to be stored at `key`
    /// and return the stamped `updated_at`.
    ///
    /// `previous` is the record currently stored there, if any. Its
    /// `created_at` always wins, and `updated_at` never moves backwards.
    pub fn stamp_write(&mut self, key: &str, previous: Option<&Entity>, now: u64) -> u64 {
        self.set(FIELD_KEY, key);

        let prior_created = previous
            .and_then(|p| p.0.get(FIELD_CREATED_AT))
            .filter(|v| !v.is_null())
            .cloned();
        match prior_created {
            Some(created) => self.set(FIELD_CREATED_AT, created),
            None if self.0.get(FIELD_CREATED_AT).is_some_and(|v| !v.is_null()) => {}
            None => self.set(FIELD_CREATED_AT, now),
        }

        // Fractional stamps from older writers round up so the floor holds.
        let floor = previous
            .and_then(Entity::updated_at)
            .map(|t| t.ceil() as u64)
            .unwrap_or(0);
        let stamped = now.max(floor);
        self.set(FIELD_UPDATED_AT, stamped);
        stamped
    }

    fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn epoch(value: &Value) -> Option<f64> {
    value.as_f64().filter(|t| t.is_finite() && *t >= 0.0)
}

/// Composite `{entity_type}:{id}` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Eight lowercase hex characters from the OS RNG.
pub fn random_id() -> Result<String, getrandom::Error> {
    let mut buf = [0u8; 4];
    getrandom::getrandom(&mut buf)?;
    Ok(hex::encode(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(body: Value) -> Entity {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn body_survives_round_trip_verbatim() {
        let body = json!({
            "type": "task",
            "id": 42,
            "name": 7,
            "metadata": null,
            "github_ref": 42,
            "created_at": 1700000000.5,
            "sha_hash": "abc",
            "tags": ["a", "b"],
        });
        let back = serde_json::to_value(entity(body.clone())).unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(serde_json::from_value::<Entity>(json!("task")).is_err());
        assert!(serde_json::from_value::<Entity>(json!([1, 2])).is_err());
    }

    #[test]
    fn accessors_render_numbers_as_text() {
        let e = entity(json!({ "type": "task", "id": 42, "name": 7, "status": "todo" }));
        assert_eq!(e.entity_type().as_deref(), Some("task"));
        assert_eq!(e.id().as_deref(), Some("42"));
        assert_eq!(e.name().as_deref(), Some("7"));
        assert_eq!(e.status().as_deref(), Some("todo"));
    }

    #[test]
    fn entity_type_prefers_full_name_and_skips_empty() {
        let e = entity(json!({ "entity_type": "deployment", "type": "task" }));
        assert_eq!(e.entity_type().as_deref(), Some("deployment"));

        let e = entity(json!({ "entity_type": "", "type": "task" }));
        assert_eq!(e.entity_type().as_deref(), Some("task"));

        assert_eq!(entity(json!({ "type": "" })).entity_type(), None);
    }

    #[test]
    fn timestamps_accept_floats() {
        let e = entity(json!({ "created_at": 1700000000.5, "updated_at": 1700000001 }));
        assert_eq!(e.created_at(), Some(1700000000.5));
        assert_eq!(e.updated_at(), Some(1700000001.0));
        assert_eq!(entity(json!({ "created_at": "soon" })).created_at(), None);
    }

    #[test]
    fn kind_falls_back_to_key_prefix() {
        let e = Entity::default().with(FIELD_KEY, "deployment:deploy-9");
        assert_eq!(e.kind().as_deref(), Some("deployment"));
        assert_eq!(Entity::default().kind(), None);
        assert_eq!(Entity::default().with(FIELD_KEY, ":x").kind(), None);
    }

    #[test]
    fn derive_key_prefers_explicit_key() {
        let e = entity(json!({ "key": "custom:abc", "entity_type": "task", "id": "1" }));
        assert_eq!(e.derive_key("task").as_deref(), Some("custom:abc"));
    }

    #[test]
    fn derive_key_uses_default_type() {
        let e = entity(json!({ "id": 7 }));
        assert_eq!(e.derive_key(DEFAULT_ENTITY_TYPE).as_deref(), Some("task:7"));
        let e = entity(json!({ "type": "", "id": "x" }));
        assert_eq!(e.derive_key(DEFAULT_ENTITY_TYPE).as_deref(), Some("task:x"));
        assert_eq!(Entity::default().derive_key("task"), None);
        assert_eq!(entity(json!({ "id": "" })).derive_key("task"), None);
    }

    #[test]
    fn stamp_first_write_sets_both_timestamps() {
        let mut e = Entity::default();
        let stamped = e.stamp_write("task:1", None, 1000);
        assert_eq!(stamped, 1000);
        assert_eq!(e.key(), Some("task:1"));
        assert_eq!(e.get(FIELD_CREATED_AT), Some(&json!(1000)));
        assert_eq!(e.get(FIELD_UPDATED_AT), Some(&json!(1000)));
    }

    #[test]
    fn stamp_keeps_supplied_created_at_on_first_write() {
        let mut e = entity(json!({ "created_at": 500.25 }));
        e.stamp_write("task:1", None, 1000);
        assert_eq!(e.get(FIELD_CREATED_AT), Some(&json!(500.25)));
    }

    #[test]
    fn stamp_never_overwrites_created_at() {
        let previous = entity(json!({ "created_at": 100, "updated_at": 200 }));
        let mut e = entity(json!({ "created_at": 9999 }));
        e.stamp_write("task:1", Some(&previous), 300);
        assert_eq!(e.get(FIELD_CREATED_AT), Some(&json!(100)));
        assert_eq!(e.get(FIELD_UPDATED_AT), Some(&json!(300)));
    }

    #[test]
    fn stamp_updated_at_is_monotonic() {
        let previous = entity(json!({ "created_at": 100, "updated_at": 5000 }));
        let mut e = Entity::default();
        assert_eq!(e.stamp_write("task:1", Some(&previous), 4000), 5000);

        let previous = entity(json!({ "updated_at": 4000.4 }));
        let mut e = Entity::default();
        assert_eq!(e.stamp_write("task:1", Some(&previous), 4000), 4001);
    }

    #[test]
    fn entity_key_display() {
        assert_eq!(EntityKey::new("task", "issue-42").to_string(), "task:issue-42");
    }

    #[test]
    fn random_id_is_eight_hex_chars() {
        let id = random_id().unwrap();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
