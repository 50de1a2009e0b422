//! POST /sync: bulk upsert.
//!
//! Each record is written on its own through the same path as PUT. A bad
//! record is reported in its result slot and does not stop the others.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stateboard_core::{DEFAULT_ENTITY_TYPE, Entity, epoch_secs};
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::RawBody;
use crate::handlers::parse_json;

/// Accepts `{"records": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SyncBody {
    Wrapped { records: Vec<Value> },
    Bare(Vec<Value>),
}

impl SyncBody {
    fn into_records(self) -> Vec<Value> {
        match self {
            SyncBody::Wrapped { records } | SyncBody::Bare(records) => records,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SyncResult {
    pub key: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: usize,
    pub results: Vec<SyncResult>,
    pub timestamp: u64,
}

pub async fn sync_entities(
    State(state): State<AppState>,
    RawBody(body): RawBody,
) -> ApiResult<Json<SyncResponse>> {
    let records = parse_json::<SyncBody>(&body)?.into_records();
    let now = epoch_secs();

    let results: Vec<SyncResult> = records
        .into_iter()
        .map(|raw| sync_one(&state, raw, now))
        .collect();
    let synced = results.iter().filter(|r| r.success).count();

    info!(synced, total = results.len(), "sync complete");
    Ok(Json(SyncResponse {
        synced,
        results,
        timestamp: now,
    }))
}

fn sync_one(state: &AppState, raw: Value, now: u64) -> SyncResult {
    let entity: Entity = match serde_json::from_value(raw) {
        Ok(entity) => entity,
        Err(e) => return failed(None, format!("invalid record: {e}")),
    };
    let Some(key) = entity.derive_key(DEFAULT_ENTITY_TYPE) else {
        return failed(None, "record has neither key nor id".to_string());
    };

    match state.store.upsert(&key, entity, now) {
        Ok(_) => SyncResult {
            key: Some(key),
            success: true,
            error: None,
        },
        Err(e) => {
            warn!(%key, error = %e, "sync write failed");
            failed(Some(key), e.to_string())
        }
    }
}

fn failed(key: Option<String>, error: String) -> SyncResult {
    SyncResult {
        key,
        success: false,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::test_support::test_state;
    use serde_json::json;

    fn body(value: Value) -> RawBody {
        RawBody(serde_json::to_vec(&value).unwrap().into())
    }

    #[tokio::test]
    async fn wrapped_records_are_written() {
        let state = test_state();
        let Json(resp) = sync_entities(
            State(state.clone()),
            body(json!({ "records": [
                { "type": "task", "id": "1", "status": "todo" },
                { "key": "deployment:deploy-3", "status": "done" },
                { "id": "2" },
            ]})),
        )
        .await
        .unwrap();

        assert_eq!(resp.synced, 3);
        let keys: Vec<_> = resp.results.iter().map(|r| r.key.as_deref().unwrap()).collect();
        assert_eq!(keys, vec!["task:1", "deployment:deploy-3", "task:2"]);

        let stored = state.store.get("deployment:deploy-3").unwrap().unwrap();
        assert_eq!(stored.updated_at(), Some(resp.timestamp as f64));
    }

    #[tokio::test]
    async fn bare_array_is_accepted() {
        let Json(resp) = sync_entities(State(test_state()), body(json!([{ "id": "x" }])))
            .await
            .unwrap();
        assert_eq!(resp.synced, 1);
    }

    #[tokio::test]
    async fn bad_records_fail_individually() {
        let state = test_state();
        let Json(resp) = sync_entities(
            State(state.clone()),
            body(json!({ "records": [
                { "name": "no id" },
                { "id": "ok" },
                "not an object",
            ]})),
        )
        .await
        .unwrap();

        assert_eq!(resp.synced, 1);
        assert_eq!(resp.results.len(), 3);
        assert!(!resp.results[0].success);
        assert!(resp.results[0].key.is_none());
        assert!(resp.results[1].success);
        assert!(!resp.results[2].success);
        assert!(state.store.get("task:ok").unwrap().is_some());
    }

    #[tokio::test]
    async fn sync_preserves_created_at() {
        let state = test_state();
        state
            .store
            .upsert("task:1", Entity::default(), 100)
            .unwrap();

        sync_entities(State(state.clone()), body(json!([{ "id": "1", "status": "done" }])))
            .await
            .unwrap();

        let stored = state.store.get("task:1").unwrap().unwrap();
        assert_eq!(stored.created_at(), Some(100.0));
        assert_eq!(stored.status().as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn records_with_float_timestamps_and_numeric_ids_sync() {
        let state = test_state();
        let Json(resp) = sync_entities(
            State(state.clone()),
            body(json!({ "records": [{
                "id": "a1b2c3d4",
                "entity_type": "task",
                "name": "Imported",
                "status": "triage",
                "metadata": {},
                "github_ref": null,
                "salesforce_id": null,
                "cloudflare_key": "task:a1b2c3d4",
                "created_at": 1700000000.123,
                "updated_at": 1700000050.456,
                "sha_hash": null,
            }, { "type": "task", "id": 9 }]})),
        )
        .await
        .unwrap();

        assert_eq!(resp.synced, 2);
        assert_eq!(resp.results[1].key.as_deref(), Some("task:9"));
        let stored = state.store.get("task:a1b2c3d4").unwrap().unwrap();
        assert_eq!(stored.created_at(), Some(1700000000.123));
        assert_eq!(stored.get("cloudflare_key"), Some(&json!("task:a1b2c3d4")));
        assert_eq!(stored.get("sha_hash"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn non_array_body_is_internal() {
        let err = sync_entities(State(test_state()), body(json!({ "nope": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
