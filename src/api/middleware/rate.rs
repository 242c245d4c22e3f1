//! Per-client rate limiting middleware.
//!
//! Sliding window of `RATE_LIMIT_RPM` requests per minute. Disabled unless
//! `ENABLE_RATE_LIMITING` is set.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::middleware::auth::extract_api_key;
use crate::api::types::{hash_key, ApiContext};

/// Extract a rate-limit key from the request.
///
/// Authenticated clients are keyed by a digest of their API key, others by
/// forwarded or peer address.
fn rate_key(req: &Request<axum::body::Body>) -> String {
    if let Some(key) = extract_api_key(req) {
        let digest = hash_key(&key);
        let prefix: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        return format!("key:{prefix}");
    }

    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return format!("ip:{addr}");
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Per-client rate limiting. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    if !ctx.config.rate_limiting {
        return Ok(next.run(req).await);
    }

    let key = rate_key(&req);

    // MutexGuard is !Send, drop it before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}
