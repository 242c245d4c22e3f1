use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{map_model_label, AssertionModel, ModelInfo};
use super::ModelError;
use crate::models::AssertionLabel;
use crate::pipeline::assertion::ModelPrediction;

/// HTTP client for a text-classification inference server.
///
/// Speaks the Hugging Face inference convention: `POST {base}/predict` with
/// `{"inputs": [...]}` and one classification (or ranked list) per input.
pub struct InferenceClient {
    base_url: String,
    model_name: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    /// Set after the first successful round trip.
    warmed_up: AtomicBool,
}

impl InferenceClient {
    pub fn new(base_url: &str, model_name: &str, timeout_secs: u64) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
            client,
            timeout_secs,
            warmed_up: AtomicBool::new(false),
        })
    }

    /// Send one warm-up sentence so the server loads its weights before real traffic.
    pub fn warm_up(&self) -> Result<(), ModelError> {
        self.predict("Test sentence for model warmup.")?;
        tracing::info!(model = %self.model_name, "Model warmed up");
        Ok(())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_connect() {
            ModelError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ModelError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            ModelError::HttpClient(e.to_string())
        }
    }
}

/// Request body for `/predict`.
#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    label: String,
    score: f64,
}

/// Servers answer either with the top label per input or a ranked list per input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Single(RawClassification),
    Ranked(Vec<RawClassification>),
}

impl RawEntry {
    fn into_prediction(self) -> Result<ModelPrediction, ModelError> {
        let top = match self {
            RawEntry::Single(c) => c,
            RawEntry::Ranked(list) => list
                .into_iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .ok_or_else(|| ModelError::ResponseParsing("empty classification list".into()))?,
        };
        let label = map_model_label(&top.label)?;
        Ok(ModelPrediction::new(label, top.score)?)
    }
}

/// Convert a raw `/predict` body into predictions, checking the count.
fn parse_predictions(body: &str, expected: usize) -> Result<Vec<ModelPrediction>, ModelError> {
    let entries: Vec<RawEntry> =
        serde_json::from_str(body).map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
    if entries.len() != expected {
        return Err(ModelError::CountMismatch {
            expected,
            received: entries.len(),
        });
    }
    entries.into_iter().map(RawEntry::into_prediction).collect()
}

impl AssertionModel for InferenceClient {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_name.clone(),
            endpoint: self.base_url.clone(),
            labels: vec![
                AssertionLabel::Present,
                AssertionLabel::Absent,
                AssertionLabel::Possible,
            ],
        }
    }

    fn is_ready(&self) -> bool {
        if self.warmed_up.load(Ordering::Relaxed) {
            return true;
        }
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Inference server health probe failed");
                false
            }
        }
    }

    fn predict_batch(&self, sentences: &[String]) -> Result<Vec<ModelPrediction>, ModelError> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/predict", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&PredictRequest { inputs: sentences })
            .send()
            .map_err(|e| {
                let err = self.map_send_error(e);
                if matches!(err, ModelError::Connection(_)) {
                    // Fall back to the health probe until the server answers again
                    self.warmed_up.store(false, Ordering::Relaxed);
                }
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
        let predictions = parse_predictions(&body, sentences.len())?;
        self.warmed_up.store(true, Ordering::Relaxed);
        Ok(predictions)
    }
}
