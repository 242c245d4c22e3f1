//! Model metadata endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::endpoints::health::model_ready;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::AssertionLabel;
use crate::pipeline::model::ModelInfo;

#[derive(Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub category: &'static str,
    pub target_label: AssertionLabel,
    pub priority: u8,
    pub patterns: usize,
}

#[derive(Serialize)]
pub struct ModelInfoResponse {
    #[serde(flatten)]
    pub model: ModelInfo,
    pub output_labels: Vec<AssertionLabel>,
    pub rules: Vec<RuleSummary>,
    pub identifier_masking: bool,
}

/// `GET /model/info`: Model metadata plus the active rule set.
pub async fn info(State(ctx): State<ApiContext>) -> Result<Json<ModelInfoResponse>, ApiError> {
    if !model_ready(&ctx).await? {
        return Err(ApiError::ModelNotReady);
    }

    let rules = ctx
        .pipeline
        .lexicon()
        .rules()
        .map(|rule| RuleSummary {
            name: rule.name.clone(),
            category: rule.category.as_str(),
            target_label: rule.target_label,
            priority: rule.priority(),
            patterns: rule.patterns.len(),
        })
        .collect();

    Ok(Json(ModelInfoResponse {
        model: ctx.model.info(),
        output_labels: AssertionLabel::ALL.to_vec(),
        rules,
        identifier_masking: ctx.config.mask_identifiers,
    }))
}
