//! Prediction endpoints.
//!
//! Both endpoints share one path: sanitize every sentence, mask identifiers,
//! one model call for the whole batch, then the rule layer.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::assertion::{mask_identifiers, AssertionError, AssertionResult};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub sentence: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub sentences: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: AssertionResult,
    pub prediction_time_ms: f64,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<AssertionResult>,
    pub batch_size: usize,
    pub total_prediction_time_ms: f64,
    pub request_id: String,
}

/// `POST /predict`: Classify one sentence.
pub async fn predict(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let mut results = classify(&ctx, vec![body.sentence]).await?;
    let result = results
        .pop()
        .ok_or_else(|| ApiError::Internal("empty pipeline output".into()))?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    tracing::info!(
        %request_id,
        label = result.label.as_str(),
        model_label = result.model_label.as_str(),
        rule = result.rule_applied.as_deref().unwrap_or("none"),
        elapsed_ms,
        "Prediction completed"
    );

    Ok(Json(PredictResponse {
        result,
        prediction_time_ms: elapsed_ms,
        request_id,
    }))
}

/// `POST /predict/batch`: Classify up to `MAX_BATCH_SIZE` sentences.
pub async fn predict_batch(
    State(ctx): State<ApiContext>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if body.sentences.is_empty() {
        return Err(ApiError::BadRequest("Batch must contain at least one sentence".into()));
    }
    if body.sentences.len() > ctx.config.max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "Batch size {} exceeds maximum of {}",
            body.sentences.len(),
            ctx.config.max_batch_size
        )));
    }

    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let predictions = classify(&ctx, body.sentences).await?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    tracing::info!(
        %request_id,
        batch_size = predictions.len(),
        overrides = predictions.iter().filter(|r| r.is_override()).count(),
        elapsed_ms,
        "Batch prediction completed"
    );

    Ok(Json(BatchPredictResponse {
        batch_size: predictions.len(),
        predictions,
        total_prediction_time_ms: elapsed_ms,
        request_id,
    }))
}

/// Sanitize, mask, run the model once and apply the rule layer.
async fn classify(ctx: &ApiContext, sentences: Vec<String>) -> Result<Vec<AssertionResult>, ApiError> {
    let mut texts = sentences
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            ctx.pipeline
                .sanitize(raw)
                .map_err(|source| AssertionError::InvalidSentence { index, source })
        })
        .collect::<Result<Vec<String>, _>>()?;

    if ctx.config.mask_identifiers {
        texts = texts.iter().map(|t| mask_identifiers(t)).collect();
    }

    let model = ctx.model.clone();
    let (predictions, texts) = tokio::task::spawn_blocking(move || {
        let predictions = model.predict_batch(&texts);
        (predictions, texts)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("model task failed: {e}")))?;
    let predictions = predictions?;

    // Length was checked against the raw input; masking may lengthen the text
    let results = ctx.pipeline.apply_sanitized(&predictions, &texts)?;
    ctx.stats.record_predictions(results.len());
    Ok(results)
}
