//! API-key authentication middleware.
//!
//! Accepts the key from `Authorization: Bearer <key>`, `X-API-Key`, or the
//! `api_key` query parameter. When no keys are configured every request passes.

use axum::extract::Query;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Require a configured API key.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_api_key(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_api_key_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_api_key_inner(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    if !ctx.api_keys.is_enabled() {
        return Ok(next.run(req).await);
    }

    let valid = extract_api_key(&req)
        .map(|key| ctx.api_keys.verify(&key))
        .unwrap_or(false);

    if !valid {
        tracing::warn!(path = req.uri().path(), "Rejected request with missing or invalid API key");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// `?api_key=` query parameter, percent-decoded.
#[derive(Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Pull the presented key from headers first, then the query string.
pub fn extract_api_key<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();

    let bearer = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let header_key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    bearer
        .or(header_key)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .or_else(|| {
            Query::<ApiKeyQuery>::try_from_uri(req.uri())
                .ok()
                .and_then(|Query(query)| query.api_key)
                .filter(|key| !key.is_empty())
        })
}
