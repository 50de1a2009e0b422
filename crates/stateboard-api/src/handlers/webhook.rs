//! POST /webhook/github: record GitHub events as entities.
//!
//! The event name comes from the `X-GitHub-Event` header. Recognized events
//! are normalized and upserted; everything else is acknowledged with
//! `success: true` and no write. The body of an unrouted event is never
//! parsed, so non-JSON deliveries such as form-encoded pings are accepted.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use stateboard_core::epoch_secs;
use stateboard_webhook::{Outcome, normalize, route_for};
use tracing::{debug, info};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::RawBody;
use crate::handlers::parse_json;

/// Header name for GitHub event type.
pub const HEADER_EVENT: &str = "x-github-event";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> ApiResult<Json<WebhookResponse>> {
    let event = headers
        .get(HEADER_EVENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut response = WebhookResponse {
        success: true,
        event,
        key: None,
        status: None,
    };

    if route_for(&response.event).is_none() {
        debug!(event = %response.event, "webhook acknowledged without route");
        return Ok(Json(response));
    }

    let payload: Value = parse_json(&body)?;
    let now = epoch_secs();

    if let Outcome::Record(record) = normalize(&response.event, &payload, now) {
        let key = record.key.to_string();
        state.store.upsert(&key, record.entity, now)?;
        info!(event = %response.event, %key, status = %record.status, "webhook recorded");
        response.key = Some(key);
        response.status = Some(record.status.as_str().to_string());
    }

    Ok(Json(response))
}
