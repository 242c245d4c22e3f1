use std::sync::LazyLock;

use regex::Regex;

/// Identifier shapes masked before text leaves the request boundary.
/// Order matters: SSNs are claimed before the looser phone pattern sees them.
static IDENTIFIER_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("Invalid SSN regex"), "[SSN]"),
        (
            Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("Invalid phone regex"),
            "[PHONE]",
        ),
        (
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .expect("Invalid email regex"),
            "[EMAIL]",
        ),
        (Regex::new(r"\b\d{6,}\b").expect("Invalid ID regex"), "[ID]"),
    ]
});

/// Replace SSNs, phone numbers, e-mail addresses and long digit runs with placeholders.
///
/// Applied to already-sanitized text. Trigger cues are never touched since every
/// pattern requires digits or an `@`.
pub fn mask_identifiers(text: &str) -> String {
    let mut result = text.to_string();
    for (regex, placeholder) in IDENTIFIER_PATTERNS.iter() {
        if regex.is_match(&result) {
            result = regex.replace_all(&result, *placeholder).into_owned();
        }
    }
    result
}
