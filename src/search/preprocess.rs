//! Text preprocessing for relevance scoring
//!
//! Lowercases, replaces non-word characters with spaces, splits on
//! whitespace, drops tokens of two characters or fewer and removes common
//! English function words. Token order is preserved.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Common English function words ignored by the scorer
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now",
    "old", "see", "two", "who", "boy", "did", "she", "use", "way", "many", "then", "them",
    "these", "this", "that", "with", "have", "from", "they", "know", "want", "been", "good",
    "much", "some", "time", "very", "when", "come", "here", "just", "like", "long", "make",
    "over", "such", "take", "than", "well", "were", "what", "will", "your", "about", "would",
    "there", "their", "which", "could", "other", "into", "more", "also", "only", "should",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

/// Minimum token length (in characters) kept by [`tokenize`]
pub const MIN_TOKEN_CHARS: usize = 3;

/// Check whether a lowercase word is a stopword
pub fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

/// Tokenize text into scoring terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|s| !is_stopword(s))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(
            tokenize("How do I fix the Python ImportError?"),
            vec!["fix", "python", "importerror"]
        );
    }

    #[test]
    fn test_tokenize_punctuation_becomes_separator() {
        assert_eq!(
            tokenize("fetch()/await-async; node.js"),
            vec!["fetch", "await", "async", "node"]
        );
    }

    #[test]
    fn test_tokenize_keeps_underscores_and_order() {
        assert_eq!(
            tokenize("snake_case beats camelCase"),
            vec!["snake_case", "beats", "camelcase"]
        );
    }

    #[test]
    fn test_tokenize_empty_and_trivial() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("a an to of it is").is_empty());
        assert!(tokenize("   \n\t ").is_empty());
    }

    #[test]
    fn test_stopword_list_size() {
        assert!(STOPWORDS.len() >= 75);
        assert!(is_stopword("the"));
        assert!(!is_stopword("database"));
    }
}
