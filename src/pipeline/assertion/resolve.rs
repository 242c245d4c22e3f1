use super::types::{AssertionResult, ModelPrediction, RuleMatch};

/// Combine a model prediction with the rule that fired, if any.
///
/// A disagreeing rule overrides the model label regardless of score. An agreeing
/// rule is still recorded in `rule_applied`. The score always stays the model's.
pub fn resolve(prediction: &ModelPrediction, rule_match: Option<&RuleMatch>) -> AssertionResult {
    match rule_match {
        None => AssertionResult {
            label: prediction.model_label,
            model_label: prediction.model_label,
            score: prediction.score,
            rule_applied: None,
        },
        Some(m) => {
            if m.target_label != prediction.model_label {
                tracing::debug!(
                    rule = %m.rule_name,
                    from = prediction.model_label.as_str(),
                    to = m.target_label.as_str(),
                    "Rule overrode model label"
                );
            }
            AssertionResult {
                label: m.target_label,
                model_label: prediction.model_label,
                score: prediction.score,
                rule_applied: Some(m.rule_name.clone()),
            }
        }
    }
}
