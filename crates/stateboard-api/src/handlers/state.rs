//! Entity CRUD handlers under `/state`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use stateboard_core::entity::{FIELD_ENTITY_TYPE, FIELD_ID, FIELD_STATUS};
use stateboard_core::{
    CanonicalStatus, DEFAULT_ENTITY_TYPE, Entity, EntityKey, epoch_secs, random_id,
};
use tracing::info;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, RawBody};
use crate::handlers::parse_json;

/// GET /state/{key}
pub async fn get_entity(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Json<Entity>> {
    match state.store.get(&key)? {
        Some(entity) => Ok(Json(entity)),
        None => Err(not_found(&key)),
    }
}

/// Query string for listing. `limit` stays a string so a bad value falls
/// back to the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub prefix: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub records: Vec<Entity>,
    pub count: usize,
    pub cursor: Option<String>,
}

/// GET /state?prefix=&limit=&cursor=
pub async fn list_entities(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let limit = state.settings.limits.resolve_list_limit(params.limit.as_deref());
    let prefix = params.prefix.unwrap_or_default();
    let cursor = params.cursor.as_deref().filter(|c| !c.is_empty());

    let page = state.store.list(&prefix, limit, cursor)?;
    Ok(Json(ListResponse {
        count: page.records.len(),
        records: page.records,
        cursor: page.cursor,
    }))
}

#[derive(Debug, Serialize)]
pub struct PutResponse {
    pub success: bool,
    pub key: String,
    pub updated_at: u64,
}

/// PUT /state/{key}: the body replaces whatever is stored.
pub async fn put_entity(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    RawBody(body): RawBody,
) -> ApiResult<Json<PutResponse>> {
    let entity: Entity = parse_json(&body)?;
    let stored = state.store.upsert(&key, entity, epoch_secs())?;
    info!(%key, "entity put");
    Ok(Json(PutResponse {
        success: true,
        updated_at: stamped_at(&stored),
        key,
    }))
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub key: String,
    pub record: Entity,
}

/// POST /state
pub async fn create_entity(
    State(state): State<AppState>,
    RawBody(body): RawBody,
) -> ApiResult<(StatusCode, Json<CreateResponse>)> {
    let mut entity: Entity = parse_json(&body)?;
    let key = assign_key(&mut entity)?;
    let record = state.store.upsert(&key, entity, epoch_secs())?;
    info!(%key, "entity created");
    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            success: true,
            key,
            record,
        }),
    ))
}

/// Use the body's key, or build `{type}:{id}` and write any defaulted
/// parts back into the record. Empty types and ids count as absent.
fn assign_key(entity: &mut Entity) -> ApiResult<String> {
    if let Some(key) = entity.key() {
        return Ok(key.to_string());
    }

    let entity_type = match entity.entity_type() {
        Some(entity_type) => entity_type,
        None => {
            entity.set(FIELD_ENTITY_TYPE, DEFAULT_ENTITY_TYPE);
            DEFAULT_ENTITY_TYPE.to_string()
        }
    };
    let id = match entity.id() {
        Some(id) => id,
        None => {
            let id = random_id().map_err(|e| ApiError::Internal(format!("id generation: {e}")))?;
            entity.set(FIELD_ID, id.clone());
            id
        }
    };
    Ok(EntityKey::new(entity_type, id).to_string())
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub key: String,
    pub status: CanonicalStatus,
    pub updated_at: u64,
}

/// PUT /state/{key}/status: move an existing record to a canonical status.
///
/// Only the `status` field changes; the rest of the record is kept.
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    RawBody(body): RawBody,
) -> ApiResult<Json<StatusResponse>> {
    let StatusBody { status } = parse_json(&body)?;
    let status = CanonicalStatus::parse(&status)
        .ok_or_else(|| ApiError::Internal(format!("unknown status: {status}")))?;

    let Some(mut entity) = state.store.get(&key)? else {
        return Err(not_found(&key));
    };
    entity.set(FIELD_STATUS, status.as_str());
    let stored = state.store.upsert(&key, entity, epoch_secs())?;
    info!(%key, %status, "entity status updated");
    Ok(Json(StatusResponse {
        success: true,
        updated_at: stamped_at(&stored),
        key,
        status,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub key: String,
    /// Whether a record was actually removed.
    pub deleted: bool,
}

/// DELETE /state/{key}: succeeds whether or not the key existed.
pub async fn delete_entity(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.store.delete(&key)?;
    info!(%key, deleted, "entity deleted");
    Ok(Json(DeleteResponse {
        success: true,
        key,
        deleted,
    }))
}

fn not_found(key: &str) -> ApiError {
    ApiError::NotFound(format!("entity not found: {key}"))
}

/// Stamped writes always carry whole seconds.
fn stamped_at(entity: &Entity) -> u64 {
    entity.updated_at().map(|t| t as u64).unwrap_or_default()
}
