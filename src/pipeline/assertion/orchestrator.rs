use super::lexicon::TriggerLexicon;
use super::matcher::match_sentence;
use super::resolve::resolve;
use super::sanitize::{sanitize, DEFAULT_MAX_SENTENCE_LENGTH};
use super::types::{AssertionError, AssertionResult, ModelPrediction, ValidationError};

/// The hybrid decision layer: sanitizer, rule matcher and label resolver bound
/// to one lexicon and one length limit.
///
/// Holds only shared, read-only state, so one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct AssertionPipeline<'a> {
    lexicon: &'a TriggerLexicon,
    max_sentence_length: usize,
}

impl AssertionPipeline<'static> {
    /// Built-in lexicon with the default sentence length limit.
    pub fn new() -> Self {
        Self::with_lexicon(TriggerLexicon::builtin(), DEFAULT_MAX_SENTENCE_LENGTH)
    }

    /// Built-in lexicon with a configured sentence length limit.
    pub fn with_max_length(max_sentence_length: usize) -> Self {
        Self::with_lexicon(TriggerLexicon::builtin(), max_sentence_length)
    }
}

impl Default for AssertionPipeline<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AssertionPipeline<'a> {
    pub fn with_lexicon(lexicon: &'a TriggerLexicon, max_sentence_length: usize) -> Self {
        Self {
            lexicon,
            max_sentence_length,
        }
    }

    pub fn lexicon(&self) -> &'a TriggerLexicon {
        self.lexicon
    }

    pub fn max_sentence_length(&self) -> usize {
        self.max_sentence_length
    }

    /// Sanitize one sentence against this pipeline's length limit.
    pub fn sanitize(&self, raw: &str) -> Result<String, ValidationError> {
        sanitize(raw, self.max_sentence_length)
    }

    /// Classify a single sentence. Equivalent to a batch of one.
    pub fn classify(
        &self,
        prediction: &ModelPrediction,
        sentence: &str,
    ) -> Result<AssertionResult, AssertionError> {
        let mut results = self.apply(std::slice::from_ref(prediction), &[sentence])?;
        Ok(results.remove(0))
    }

    /// Run the pipeline with per-sentence outcomes.
    ///
    /// Fails only on a prediction/sentence count mismatch. Each invalid sentence
    /// yields its own `ValidationError` without affecting its neighbours.
    pub fn evaluate_each<S: AsRef<str>>(
        &self,
        predictions: &[ModelPrediction],
        sentences: &[S],
    ) -> Result<Vec<Result<AssertionResult, ValidationError>>, AssertionError> {
        check_lengths(predictions, sentences)?;

        let sanitized: Vec<Result<String, ValidationError>> = sentences
            .iter()
            .map(|s| self.sanitize(s.as_ref()))
            .collect();

        Ok(predictions
            .iter()
            .zip(sanitized)
            .map(|(prediction, text)| text.map(|t| self.resolve_one(prediction, &t)))
            .collect())
    }

    /// Run the pipeline over a whole batch, rejecting it atomically.
    ///
    /// Every sentence is sanitized before any rule matching starts. The first
    /// invalid sentence is reported with its index. Output order mirrors input order.
    pub fn apply<S: AsRef<str>>(
        &self,
        predictions: &[ModelPrediction],
        sentences: &[S],
    ) -> Result<Vec<AssertionResult>, AssertionError> {
        check_lengths(predictions, sentences)?;

        let sanitized = sentences
            .iter()
            .enumerate()
            .map(|(index, s)| {
                self.sanitize(s.as_ref())
                    .map_err(|source| AssertionError::InvalidSentence { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.apply_sanitized(predictions, &sanitized)
    }

    /// Match and resolve text that has already been sanitized.
    ///
    /// Callers that transform text after sanitizing (identifier masking) use
    /// this so the length limit stays tied to the raw input.
    pub fn apply_sanitized<S: AsRef<str>>(
        &self,
        predictions: &[ModelPrediction],
        sanitized: &[S],
    ) -> Result<Vec<AssertionResult>, AssertionError> {
        check_lengths(predictions, sanitized)?;

        let results: Vec<AssertionResult> = predictions
            .iter()
            .zip(sanitized)
            .map(|(prediction, text)| self.resolve_one(prediction, text.as_ref()))
            .collect();

        tracing::debug!(
            batch_size = results.len(),
            rules_fired = results.iter().filter(|r| r.rule_applied.is_some()).count(),
            overrides = results.iter().filter(|r| r.is_override()).count(),
            "Assertion pipeline applied"
        );

        Ok(results)
    }

    fn resolve_one(&self, prediction: &ModelPrediction, sanitized: &str) -> AssertionResult {
        let rule_match = match_sentence(sanitized, self.lexicon);
        resolve(prediction, rule_match.as_ref())
    }
}

fn check_lengths<S>(predictions: &[ModelPrediction], sentences: &[S]) -> Result<(), AssertionError> {
    if predictions.len() != sentences.len() {
        tracing::error!(
            predictions = predictions.len(),
            sentences = sentences.len(),
            "Prediction count does not match sentence count"
        );
        return Err(AssertionError::LengthMismatch {
            predictions: predictions.len(),
            sentences: sentences.len(),
        });
    }
    Ok(())
}

/// Apply the built-in pipeline to a batch of (prediction, raw sentence) pairs.
pub fn apply_pipeline<S: AsRef<str>>(
    predictions: &[ModelPrediction],
    sentences: &[S],
) -> Result<Vec<AssertionResult>, AssertionError> {
    AssertionPipeline::new().apply(predictions, sentences)
}
