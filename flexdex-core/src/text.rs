//! Tokenization shared by search and the built-in embedder.

/// Tokenize a string into lowercase terms.
///
/// Splits on non-alphanumeric characters and on camelCase boundaries, keeping
/// acronyms together (`HTMLParser` -> `htmlparser`, `SensesOS` -> `senses`, `os`).
/// Single-character tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_was_upper = false;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && !current.is_empty() && !prev_was_upper {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            current.push(ch);
            prev_was_upper = ch.is_uppercase();
        } else {
            if !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            prev_was_upper = false;
        }
    }

    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }

    tokens.retain(|t| t.chars().count() >= 2);
    tokens
}

/// Lowercase query terms: whitespace and punctuation separated, no camelCase
/// splitting, so `getall` stays one term.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
