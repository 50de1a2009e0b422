//! Turn one webhook delivery into at most one entity record.

use serde_json::Value;
use stateboard_core::entity::{
    FIELD_ENTITY_TYPE, FIELD_GITHUB_REF, FIELD_ID, FIELD_KEY, FIELD_METADATA, FIELD_NAME,
    FIELD_STATUS, FIELD_UPDATED_AT,
};
use stateboard_core::{CanonicalStatus, Entity, EntityKey};
use tracing::{debug, warn};

use crate::routes::{EventRoute, route_for};

/// A record derived from a recognized delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub key: EntityKey,
    pub status: CanonicalStatus,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event has no route; acknowledge and do nothing.
    Unrecognized,
    /// The event has a route but the payload lacks its identifier.
    Incomplete { reason: String },
    Record(NormalizedRecord),
}

/// Map `(event, payload)` onto the routing table.
///
/// The key depends only on event identifiers, so redelivery of the same
/// event targets the same record. `now` becomes the record's `updated_at`.
pub fn normalize(event: &str, payload: &Value, now: u64) -> Outcome {
    let Some(route) = route_for(event) else {
        debug!(%event, "no route for event");
        return Outcome::Unrecognized;
    };

    match derive(route, payload, now) {
        Ok(record) => {
            debug!(
                %event,
                key = %record.key,
                status = %record.status,
                "event normalized"
            );
            Outcome::Record(record)
        }
        Err(reason) => {
            warn!(%event, %reason, "event not normalized");
            Outcome::Incomplete { reason }
        }
    }
}

fn derive(route: &EventRoute, payload: &Value, now: u64) -> Result<NormalizedRecord, String> {
    let subject = payload
        .get(route.subject)
        .filter(|s| s.is_object())
        .ok_or_else(|| format!("payload has no `{}` object", route.subject))?;

    let ident = subject
        .get(route.id_field)
        .and_then(scalar)
        .ok_or_else(|| format!("`{}.{}` is missing", route.subject, route.id_field))?;

    let action = payload.get("action").and_then(Value::as_str);
    let status = route.status_for(action, subject);
    let details = (route.describe)(payload, subject);

    let id = format!("{}{}", route.id_prefix, ident);
    let key = EntityKey::new(route.entity_type, id.clone());
    let mut entity = Entity::default()
        .with(FIELD_KEY, key.to_string())
        .with(FIELD_ENTITY_TYPE, route.entity_type)
        .with(FIELD_ID, id)
        .with(FIELD_STATUS, status.as_str())
        .with(FIELD_METADATA, Value::Object(details.metadata))
        .with(FIELD_UPDATED_AT, now);
    if let Some(name) = details.name {
        entity.set(FIELD_NAME, name);
    }
    if let Some(github_ref) = details.github_ref {
        entity.set(FIELD_GITHUB_REF, github_ref);
    }

    Ok(NormalizedRecord { key, status, entity })
}

/// Numbers and non-empty strings both identify a subject.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
