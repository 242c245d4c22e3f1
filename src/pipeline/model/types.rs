use std::str::FromStr;

use serde::Serialize;

use super::ModelError;
use crate::models::AssertionLabel;
use crate::pipeline::assertion::ModelPrediction;

/// Default Hugging Face model served by the inference server.
pub const DEFAULT_MODEL_NAME: &str = "bvanaken/clinical-assertion-negation-bert";

/// Descriptive metadata about the model behind an [`AssertionModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub endpoint: String,
    pub labels: Vec<AssertionLabel>,
}

/// The statistical classifier the rule layer corrects.
///
/// Implementations block; async callers go through `spawn_blocking`.
pub trait AssertionModel: Send + Sync {
    fn info(&self) -> ModelInfo;

    /// Whether the model can serve predictions right now.
    fn is_ready(&self) -> bool;

    /// One prediction per sentence, in input order.
    fn predict_batch(&self, sentences: &[String]) -> Result<Vec<ModelPrediction>, ModelError>;

    fn predict(&self, sentence: &str) -> Result<ModelPrediction, ModelError> {
        let mut predictions = self.predict_batch(&[sentence.to_string()])?;
        match predictions.len() {
            1 => Ok(predictions.remove(0)),
            received => Err(ModelError::CountMismatch {
                expected: 1,
                received,
            }),
        }
    }
}

/// Map a raw classifier label to an assertion label.
///
/// Accepts the checkpoint's positional ids (`LABEL_0` = present, `LABEL_1` = absent,
/// `LABEL_2` = possible) as well as readable names in any case.
pub fn map_model_label(raw: &str) -> Result<AssertionLabel, ModelError> {
    match raw {
        "LABEL_0" => Ok(AssertionLabel::Present),
        "LABEL_1" => Ok(AssertionLabel::Absent),
        "LABEL_2" => Ok(AssertionLabel::Possible),
        other => AssertionLabel::from_str(&other.to_ascii_uppercase())
            .map_err(|_| ModelError::UnknownLabel(other.to_string())),
    }
}

/// Model double that replays fixed predictions, cycling when the batch is longer.
pub struct StaticModel {
    predictions: Vec<ModelPrediction>,
    ready: bool,
}

impl StaticModel {
    pub fn new(predictions: Vec<ModelPrediction>) -> Self {
        Self {
            predictions,
            ready: true,
        }
    }

    /// Every sentence gets the same prediction.
    pub fn constant(prediction: ModelPrediction) -> Self {
        Self::new(vec![prediction])
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl AssertionModel for StaticModel {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: "static".to_string(),
            endpoint: "in-process".to_string(),
            labels: AssertionLabel::ALL.to_vec(),
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn predict_batch(&self, sentences: &[String]) -> Result<Vec<ModelPrediction>, ModelError> {
        if !self.ready || self.predictions.is_empty() {
            return Err(ModelError::NotReady);
        }
        Ok(self
            .predictions
            .iter()
            .cycle()
            .take(sentences.len())
            .copied()
            .collect())
    }
}
