use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AssertionLabel, RuleCategory};

/// A raw sentence paired with its sanitized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalSentence {
    /// Text as received from the caller (untrusted).
    pub raw: String,
    /// Trimmed, whitespace-collapsed, control-free text fed to the model and the matcher.
    pub sanitized: String,
}

impl ClinicalSentence {
    /// Validate and sanitize a raw sentence.
    pub fn parse(raw: &str, max_length: usize) -> Result<Self, ValidationError> {
        let sanitized = super::sanitize::sanitize(raw, max_length)?;
        Ok(Self {
            raw: raw.to_string(),
            sanitized,
        })
    }
}

/// Label and confidence produced by the statistical model for one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub model_label: AssertionLabel,
    /// Confidence in [0.0, 1.0].
    pub score: f64,
}

impl ModelPrediction {
    /// Build a prediction, rejecting scores outside [0.0, 1.0].
    pub fn new(model_label: AssertionLabel, score: f64) -> Result<Self, InvalidScore> {
        if !(0.0..=1.0).contains(&score) {
            return Err(InvalidScore(score));
        }
        Ok(Self { model_label, score })
    }
}

/// Score outside the unit interval (or NaN).
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Model score {0} is outside [0.0, 1.0]")]
pub struct InvalidScore(pub f64);

/// One entry of a trigger rule's pattern set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPattern {
    /// Literal phrase, matched case-insensitively on word boundaries.
    Phrase(String),
    /// Regular expression, compiled case-insensitively.
    Regex(String),
}

impl TriggerPattern {
    pub fn phrase(text: &str) -> Self {
        Self::Phrase(text.to_string())
    }

    pub fn regex(pattern: &str) -> Self {
        Self::Regex(pattern.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Phrase(s) | Self::Regex(s) => s,
        }
    }
}

/// A named rule of the trigger lexicon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Unique identifier, reported as `rule_applied`.
    pub name: String,
    pub category: RuleCategory,
    pub target_label: AssertionLabel,
    /// Ordered, non-empty set of cues.
    pub patterns: Vec<TriggerPattern>,
}

impl RuleDefinition {
    /// Rule targeting its category's default label.
    pub fn new(name: &str, category: RuleCategory, patterns: Vec<TriggerPattern>) -> Self {
        Self {
            name: name.to_string(),
            category,
            target_label: category.default_label(),
            patterns,
        }
    }

    /// Override the label this rule forces.
    pub fn with_target(mut self, target_label: AssertionLabel) -> Self {
        self.target_label = target_label;
        self
    }

    /// Precedence across categories. Lower value wins.
    pub fn priority(&self) -> u8 {
        self.category.priority()
    }
}

/// The single rule that fired for a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub rule_name: String,
    pub target_label: AssertionLabel,
    pub category: RuleCategory,
    /// The winning span as it appears in the sanitized sentence.
    pub matched_text: String,
    /// Byte offset of the winning span in the sanitized sentence.
    pub offset: usize,
}

/// Final outcome for one sentence, returned to the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Final label, possibly forced by a rule.
    pub label: AssertionLabel,
    /// Label the model produced, never modified.
    pub model_label: AssertionLabel,
    /// Model confidence, never modified.
    pub score: f64,
    /// Rule that fired, whether or not it changed the label.
    pub rule_applied: Option<String>,
}

impl AssertionResult {
    /// Whether a rule replaced the model's label.
    pub fn is_override(&self) -> bool {
        self.label != self.model_label
    }
}

/// Sentence rejected by the sanitizer. Caller input fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Sentence is empty or whitespace only")]
    Empty,

    #[error("Sentence is too long ({length} characters, max {max})")]
    TooLong { length: usize, max: usize },
}

/// Failures of the assertion pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// A sentence failed sanitization. Recoverable, reported by index.
    #[error("Sentence at index {index} is invalid: {source}")]
    InvalidSentence {
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// Prediction and sentence sequences disagree in length. Integration bug.
    #[error("Internal error: {predictions} predictions for {sentences} sentences")]
    LengthMismatch { predictions: usize, sentences: usize },
}

impl AssertionError {
    /// True when the caller's input, not the integration, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSentence { .. })
    }
}

/// Failures while building a trigger lexicon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexiconError {
    #[error("Duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("Rule {0} has an empty pattern set")]
    EmptyPatternSet(String),

    #[error("Regex compilation failed for rule {rule}: {message}")]
    RegexCompilation { rule: String, message: String },
}
