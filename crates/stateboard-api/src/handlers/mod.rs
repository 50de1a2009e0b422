//! Route handlers.
//!
//! Handlers return `ApiResult`, so every failure path converges on
//! [`ApiError`]'s `IntoResponse`. Path, query and body extraction go through
//! [`crate::extract`], and bodies are parsed here, so no axum rejection
//! reaches the caller.

pub mod health;
pub mod state;
pub mod stats;
pub mod sync;
pub mod webhook;

use axum::body::Bytes;
use axum::http::{Method, Uri};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Fallback for unmatched paths and methods.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("route not found: {method} {}", uri.path()))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}
