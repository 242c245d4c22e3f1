use std::cmp::Reverse;

use super::lexicon::TriggerLexicon;
use super::types::RuleMatch;

/// Scan a sanitized sentence against a lexicon and pick at most one rule.
///
/// Tie-break: lowest category priority, then longest matched span (characters),
/// then earliest declaration in the lexicon. Absence of a match is the common case.
pub fn match_sentence(text: &str, lexicon: &TriggerLexicon) -> Option<RuleMatch> {
    let winner = lexicon
        .compiled_rules()
        .iter()
        .enumerate()
        .filter_map(|(index, rule)| {
            rule.longest_span(text).map(|span| {
                let key = (
                    rule.definition().priority(),
                    Reverse(span.as_str().chars().count()),
                    index,
                );
                (key, rule, span)
            })
        })
        .min_by_key(|(key, _, _)| *key);

    let (_, rule, span) = winner?;
    let definition = rule.definition();

    tracing::debug!(
        rule = %definition.name,
        category = definition.category.as_str(),
        target = definition.target_label.as_str(),
        offset = span.start(),
        "Trigger rule matched"
    );

    Some(RuleMatch {
        rule_name: definition.name.clone(),
        target_label: definition.target_label,
        category: definition.category,
        matched_text: span.as_str().to_string(),
        offset: span.start(),
    })
}

/// Match against the built-in lexicon.
pub fn match_builtin(text: &str) -> Option<RuleMatch> {
    match_sentence(text, TriggerLexicon::builtin())
}
