//! Word tokenization for lexical overlap scoring and the hashing embedder.

use std::collections::BTreeSet;

/// Lowercased whitespace-separated tokens with leading/trailing punctuation removed.
/// Inner punctuation (apostrophes, hyphens) is kept.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
}

/// Lowercased whitespace-separated tokens, punctuation left attached.
/// Overlap scoring counts shared tokens over these sets, so `"paris,"` and
/// `"paris"` are different words there.
pub fn word_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}
