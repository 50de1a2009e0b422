//! GET /stats: counts by type and status over a bounded scan.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use stateboard_core::Entity;

use crate::AppState;
use crate::error::ApiResult;

/// Bucket for records with no type or status.
const UNKNOWN: &str = "unknown";

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

/// Pure aggregation over an already-fetched set of entities.
pub fn aggregate(entities: &[Entity]) -> Stats {
    let mut stats = Stats {
        total: entities.len(),
        ..Default::default()
    };
    for entity in entities {
        let kind = entity.kind().unwrap_or_else(|| UNKNOWN.to_string());
        *stats.by_type.entry(kind).or_default() += 1;

        let status = entity.status().unwrap_or_else(|| UNKNOWN.to_string());
        *stats.by_status.entry(status).or_default() += 1;
    }
    stats
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Stats>> {
    let entities = state.store.scan(state.settings.limits.stats_scan_limit)?;
    Ok(Json(aggregate(&entities)))
}
