use super::types::ValidationError;

/// Maximum sentence length in characters when none is configured.
pub const DEFAULT_MAX_SENTENCE_LENGTH: usize = 1_000;

/// Normalize a raw sentence before it reaches the model or the rule matcher.
///
/// Trims, collapses every whitespace run to a single space, and drops control
/// and invisible formatting characters. Case is preserved. The length limit is
/// checked against the raw input, in characters.
pub fn sanitize(raw: &str, max_length: usize) -> Result<String, ValidationError> {
    let length = raw.chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            length,
            max: max_length,
        });
    }

    let mut text = String::with_capacity(raw.len());
    for word in raw
        .split(char::is_whitespace)
        .map(strip_hidden_characters)
        .filter(|w| !w.is_empty())
    {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&word);
    }

    if text.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(text)
}

/// Sanitize with [`DEFAULT_MAX_SENTENCE_LENGTH`].
pub fn sanitize_sentence(raw: &str) -> Result<String, ValidationError> {
    sanitize(raw, DEFAULT_MAX_SENTENCE_LENGTH)
}

/// Remove control characters and zero-width / directional formatting marks.
fn strip_hidden_characters(word: &str) -> String {
    word.chars()
        .filter(|c| !c.is_control() && !is_invisible(*c))
        .collect()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'  // Zero-width chars
        | '\u{202A}'..='\u{202E}' // Directional formatting
        | '\u{2060}'..='\u{2064}' // Invisible operators
        | '\u{2066}'..='\u{2069}' // Directional isolates
        | '\u{FEFF}'              // BOM
        | '\u{00AD}'              // Soft hyphen
        | '\u{034F}'              // Combining grapheme joiner
        | '\u{061C}'              // Arabic letter mark
        | '\u{180E}'              // Mongolian vowel separator
    )
}
