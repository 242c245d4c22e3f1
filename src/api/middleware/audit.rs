//! Request logging middleware.
//!
//! Logs method, path, status and latency of every request and reports the
//! latency in `X-Response-Time`. Bodies are never logged since they carry
//! clinical text.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;
    let elapsed = started.elapsed();

    if let Ok(val) = HeaderValue::from_str(&format!("{:.3}s", elapsed.as_secs_f64())) {
        response.headers_mut().insert("X-Response-Time", val);
    }

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Request completed"
    );

    response
}
