//! Shared-secret guard.
//!
//! A request is allowed when either the configured API-key header or an
//! `Authorization: Bearer` token equals the secret. Both candidates and the
//! secret are reduced to SHA-256 digests and compared in constant time over
//! the fixed-length digests.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, header};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::error::ApiError;

#[derive(Clone)]
pub struct SharedSecret {
    digest: [u8; 32],
    header: HeaderName,
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl SharedSecret {
    pub fn new(secret: &str, header: &str) -> Result<Self, String> {
        let header = HeaderName::from_bytes(header.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| format!("invalid auth header name {header:?}: {e}"))?;
        Ok(Self {
            digest: sha256(secret.as_bytes()),
            header,
        })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(&sha256(candidate.as_bytes()), &self.digest)
    }

    /// Check the API-key header and the bearer token.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let api_key = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| self.matches(v));
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .is_some_and(|token| self.matches(token));
        api_key | bearer
    }
}

/// Middleware for every route except health and readiness.
pub async fn require_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.settings.secret.authorize(request.headers()) {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
