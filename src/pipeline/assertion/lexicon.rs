use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Match, Regex, RegexBuilder};

use super::types::{LexiconError, RuleDefinition, TriggerPattern};
use crate::models::RuleCategory;

/// Built-in trigger lexicon, compiled once on first use and read-only afterwards.
static BUILTIN_LEXICON: LazyLock<TriggerLexicon> = LazyLock::new(|| {
    TriggerLexicon::new(builtin_rules()).expect("Invalid built-in trigger lexicon")
});

/// Rule definitions of the built-in lexicon, in declaration order.
pub fn builtin_rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new(
            "conditional_trigger",
            RuleCategory::Conditional,
            phrases(&[
                "if",
                "unless",
                "in case",
                "in the event of",
                "should the patient",
                "should",
                "when",
            ]),
        ),
        RuleDefinition::new("negation_trigger", RuleCategory::Negation, {
            let mut patterns = phrases(&[
                "denies",
                "denied",
                "no evidence of",
                "ruled out",
                "negative for",
                "no signs of",
                "without",
                "free of",
                "absence of",
                "not present",
            ]);
            patterns.push(TriggerPattern::regex(r"\bno\b"));
            patterns
        }),
        RuleDefinition::new(
            "uncertainty_trigger",
            RuleCategory::Possibility,
            phrases(&[
                "may",
                "might",
                "could",
                "possible",
                "possibly",
                "likely",
                "probable",
                "probably",
                "appears to",
                "suggests",
                "suspect",
                "suspected",
                "potential",
            ]),
        ),
        RuleDefinition::new(
            "hedged_exclusion_trigger",
            RuleCategory::Possibility,
            phrases(&[
                "cannot rule out",
                "cannot be excluded",
                "may not",
                "questionable",
                "concern for",
            ]),
        ),
    ]
}

fn phrases(list: &[&str]) -> Vec<TriggerPattern> {
    list.iter().map(|p| TriggerPattern::phrase(p)).collect()
}

/// A rule with its patterns compiled.
#[derive(Debug)]
pub struct CompiledRule {
    definition: RuleDefinition,
    regexes: Vec<Regex>,
}

impl CompiledRule {
    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    /// Longest span any of this rule's patterns matches in `text`, measured in characters.
    /// Among equal lengths the earliest pattern, then the earliest position, wins.
    pub fn longest_span<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        let mut best: Option<(usize, Match<'t>)> = None;
        for regex in &self.regexes {
            for mat in regex.find_iter(text) {
                let len = mat.as_str().chars().count();
                if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
                    best = Some((len, mat));
                }
            }
        }
        best.map(|(_, mat)| mat)
    }
}

/// Immutable, ordered catalog of trigger rules.
#[derive(Debug)]
pub struct TriggerLexicon {
    rules: Vec<CompiledRule>,
}

impl TriggerLexicon {
    /// Compile a lexicon. Declaration order is kept and serves as the final tie-break.
    pub fn new(definitions: Vec<RuleDefinition>) -> Result<Self, LexiconError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.name.clone()) {
                return Err(LexiconError::DuplicateRule(definition.name));
            }
            if definition.patterns.is_empty() {
                return Err(LexiconError::EmptyPatternSet(definition.name));
            }
            let regexes = definition
                .patterns
                .iter()
                .map(|p| compile_pattern(&definition.name, p))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(CompiledRule {
                definition,
                regexes,
            });
        }

        Ok(Self { rules })
    }

    /// The process-wide built-in lexicon.
    pub fn builtin() -> &'static TriggerLexicon {
        &BUILTIN_LEXICON
    }

    pub fn compiled_rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().map(|r| &r.definition)
    }

    pub fn get(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_pattern(rule: &str, pattern: &TriggerPattern) -> Result<Regex, LexiconError> {
    let source = match pattern {
        TriggerPattern::Phrase(phrase) => phrase_regex(phrase),
        TriggerPattern::Regex(re) => re.clone(),
    };
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| LexiconError::RegexCompilation {
            rule: rule.to_string(),
            message: e.to_string(),
        })
}

/// Literal phrase as a word-bounded regex; internal whitespace matches any run of whitespace.
fn phrase_regex(phrase: &str) -> String {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let trimmed = phrase.trim();
    let start = if is_word(trimmed.chars().next()) { r"\b" } else { "" };
    let end = if is_word(trimmed.chars().last()) { r"\b" } else { "" };
    format!("{start}{body}{end}")
}
