//! stateboard-api: REST API for Stateboard.
//!
//! Provides axum route handlers for entity CRUD, bulk sync, GitHub webhook
//! ingestion, and aggregate statistics.
//!
//! # API Routes
//!
//! | Method | Path | Auth | Description |
//! |---|---|---|---|
//! | GET | `/`, `/health` | no | Liveness |
//! | GET | `/ready` | no | Store readiness |
//! | GET | `/state` | yes | List entities (`prefix`, `limit`, `cursor`) |
//! | POST | `/state` | yes | Create an entity |
//! | GET | `/state/{key}` | yes | Fetch one entity |
//! | PUT | `/state/{key}` | yes | Overwrite an entity |
//! | DELETE | `/state/{key}` | yes | Delete an entity |
//! | PUT | `/state/{key}/status` | yes | Move an entity to a canonical status |
//! | POST | `/sync` | yes | Bulk upsert |
//! | POST | `/webhook/github` | yes | Normalize a GitHub event |
//! | GET | `/stats` | yes | Counts by type and status |
//!
//! Layers, outermost first: CORS (answers preflight), request tracing,
//! panic capture, then the shared-secret guard on everything that is not a
//! health route. Unmatched paths and methods return 404. Request bodies are
//! capped at `limits.max_body_bytes`.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use stateboard_core::config::{CorsConfig, LimitsConfig};
use stateboard_core::{ConfigError, StateboardConfig};
use stateboard_store::EntityStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::SharedSecret;
use crate::error::ApiError;

/// Startup configuration the handlers read from.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub service_name: String,
    pub secret: SharedSecret,
    pub limits: LimitsConfig,
    pub cors: CorsConfig,
}

impl ApiSettings {
    pub fn from_config(config: &StateboardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_key = config
            .auth
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("auth.api_key is not set".into()))?;
        let secret = SharedSecret::new(api_key, &config.auth.header).map_err(ConfigError::Invalid)?;
        Ok(Self {
            service_name: config.server.service_name.clone(),
            secret,
            limits: config.limits.clone(),
            cors: config.cors.clone(),
        })
    }
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: EntityStore,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(store: EntityStore, config: &StateboardConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            settings: Arc::new(ApiSettings::from_config(config)?),
        })
    }
}

/// Build the complete API router.
pub fn build_router(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.settings)?;

    let protected = Router::new()
        .route(
            "/state",
            get(handlers::state::list_entities).post(handlers::state::create_entity),
        )
        .route(
            "/state/{key}",
            get(handlers::state::get_entity)
                .put(handlers::state::put_entity)
                .delete(handlers::state::delete_entity),
        )
        .route(
            "/state/{key}/status",
            put(handlers::state::update_status),
        )
        .route("/sync", post(handlers::sync::sync_entities))
        .route("/webhook/github", post(handlers::webhook::github_webhook))
        .route("/stats", get(handlers::stats::get_stats))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.settings.limits.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_secret,
        ))
        .with_state(state.clone());

    let router = Router::new()
        .route("/", get(handlers::health::health))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .fallback_service(protected)
        .method_not_allowed_fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(router)
}

fn cors_layer(settings: &ApiSettings) -> Result<CorsLayer, ConfigError> {
    let origin = if settings.cors.allows_any() {
        AllowOrigin::from(AnyOrigin)
    } else {
        let origins = settings
            .cors
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|e| ConfigError::Invalid(format!("invalid CORS origin {o:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            settings.secret.header().clone(),
            HeaderName::from_static(handlers::webhook::HEADER_EVENT),
        ]))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(message).into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use stateboard_store::RedbStore;

    pub const SECRET: &str = "test-secret";

    pub fn test_config() -> StateboardConfig {
        let mut config = StateboardConfig::default();
        config.auth.api_key = Some(SECRET.to_string());
        config
    }

    pub fn test_state() -> AppState {
        let store = EntityStore::new(Arc::new(RedbStore::open_in_memory().unwrap()));
        AppState::new(store, &test_config()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_require_secret() {
        let config = StateboardConfig::default();
        assert!(ApiSettings::from_config(&config).is_err());
    }

    #[test]
    fn settings_reject_bad_header() {
        let mut config = test_support::test_config();
        config.auth.header = "not valid".to_string();
        assert!(ApiSettings::from_config(&config).is_err());
    }

    #[test]
    fn router_rejects_bad_origin() {
        let mut config = test_support::test_config();
        config.cors.allowed_origins = vec!["https://ok.example".into(), "bad\norigin".into()];
        let state = test_support::test_state();
        let state = AppState {
            store: state.store,
            settings: Arc::new(ApiSettings::from_config(&config).unwrap()),
        };
        assert!(build_router(state).is_err());
    }

    #[test]
    fn panic_message_is_extracted() {
        let resp = panic_response(Box::new("kaboom"));
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
