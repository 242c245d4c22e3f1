//! Service descriptor, health check and runtime counters.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SystemMetrics};
use crate::config::{APP_NAME, APP_VERSION};

/// Probe model readiness off the async runtime; the HTTP client blocks.
pub(crate) async fn model_ready(ctx: &ApiContext) -> Result<bool, ApiError> {
    let model = ctx.model.clone();
    tokio::task::spawn_blocking(move || model.is_ready())
        .await
        .map_err(|e| ApiError::Internal(format!("readiness probe task failed: {e}")))
}

/// Host readings touch procfs and mounted disks, so they run off the runtime too.
pub(crate) async fn system_metrics(ctx: &ApiContext) -> Result<SystemMetrics, ApiError> {
    let stats = ctx.stats.clone();
    tokio::task::spawn_blocking(move || stats.system_metrics())
        .await
        .map_err(|e| ApiError::Internal(format!("system metrics task failed: {e}")))
}

#[derive(Serialize)]
pub struct RootEndpoints {
    pub health: &'static str,
    pub predict: &'static str,
    pub batch_predict: &'static str,
    pub model_info: &'static str,
    pub metrics: &'static str,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub model: String,
    pub environment: String,
    pub status: &'static str,
    pub endpoints: RootEndpoints,
}

/// `GET /`: Service descriptor.
pub async fn root(State(ctx): State<ApiContext>) -> Result<Json<RootResponse>, ApiError> {
    let ready = model_ready(&ctx).await?;

    Ok(Json(RootResponse {
        name: APP_NAME,
        version: APP_VERSION,
        description: "Hybrid clinical assertion classification: model prediction corrected by lexical rules",
        model: ctx.config.model_name.clone(),
        environment: ctx.config.environment.clone(),
        status: if ready { "healthy" } else { "initializing" },
        endpoints: RootEndpoints {
            health: "/health",
            predict: "/predict",
            batch_predict: "/predict/batch",
            model_info: "/model/info",
            metrics: "/system/metrics",
        },
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: String,
    pub uptime_seconds: f64,
    pub total_predictions: u64,
    pub system_metrics: SystemMetrics,
}

/// `GET /health`: Liveness plus model readiness. Never requires a key.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let model_loaded = model_ready(&ctx).await?;
    let system_metrics = system_metrics(&ctx).await?;

    Ok(Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" },
        model_loaded,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: APP_VERSION,
        environment: ctx.config.environment.clone(),
        uptime_seconds: ctx.stats.uptime().as_secs_f64(),
        total_predictions: ctx.stats.total_predictions(),
        system_metrics,
    }))
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub total_predictions: u64,
    pub uptime_seconds: f64,
    pub memory_usage_mb: f64,
    pub cpu_usage_percent: f64,
    pub model_loaded: bool,
    pub rules_loaded: usize,
    pub max_batch_size: usize,
    pub max_sentence_length: usize,
}

/// `GET /system/metrics`: In-process counters and host usage as JSON.
pub async fn metrics(State(ctx): State<ApiContext>) -> Result<Json<MetricsResponse>, ApiError> {
    let model_loaded = model_ready(&ctx).await?;
    let system = system_metrics(&ctx).await?;

    Ok(Json(MetricsResponse {
        total_predictions: ctx.stats.total_predictions(),
        uptime_seconds: ctx.stats.uptime().as_secs_f64(),
        memory_usage_mb: system.memory_mb,
        cpu_usage_percent: system.cpu_percent,
        model_loaded,
        rules_loaded: ctx.pipeline.lexicon().len(),
        max_batch_size: ctx.config.max_batch_size,
        max_sentence_length: ctx.pipeline.max_sentence_length(),
    }))
}
