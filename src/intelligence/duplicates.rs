//! Near-duplicate detection
//!
//! Two distinct similarity notions live here:
//! - A per-save check: exact content match or Jaccard similarity of
//!   lowercase word sets above a threshold.
//! - A bulk signature: SHA-256 over the first 100 normalized characters plus
//!   the source, used by the maintenance dedup pass only.
//!
//! They are not interchangeable. The signature treats records sharing a long
//! common prefix as duplicates even when their tails differ.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::types::MemoryRecord;

/// Default Jaccard threshold; similarity must be strictly greater
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 0.85;

/// Characters of normalized content covered by [`signature`]
pub const SIGNATURE_PREFIX_CHARS: usize = 100;

/// Per-save duplicate detector
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    threshold: f32,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_THRESHOLD)
    }
}

impl DuplicateDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether `candidate` duplicates any record in `corpus`
    pub fn is_duplicate(&self, candidate: &str, corpus: &[MemoryRecord]) -> bool {
        self.find_duplicate(candidate, corpus).is_some()
    }

    /// Index of the first record `candidate` duplicates
    pub fn find_duplicate(&self, candidate: &str, corpus: &[MemoryRecord]) -> Option<usize> {
        let candidate_words = word_set(candidate);

        corpus.iter().position(|record| {
            if record.content == candidate {
                return true;
            }
            jaccard_of_sets(&candidate_words, &word_set(&record.content))
                .map(|similarity| similarity > self.threshold)
                .unwrap_or(false)
        })
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn jaccard_of_sets(a: &HashSet<String>, b: &HashSet<String>) -> Option<f32> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    let intersection = a.intersection(b).count();
    Some(intersection as f32 / union as f32)
}

/// Jaccard similarity of lowercase whitespace-split word sets
///
/// Returns `None` when both texts are empty, where the ratio is undefined.
pub fn jaccard_similarity(a: &str, b: &str) -> Option<f32> {
    jaccard_of_sets(&word_set(a), &word_set(b))
}

/// Lowercase, collapse whitespace runs to one space, trim
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Bulk-dedup signature: SHA-256 hex of the normalized prefix and source
pub fn signature(record: &MemoryRecord) -> String {
    content_signature(&record.content, &record.source)
}

/// [`signature`] over raw parts
pub fn content_signature(content: &str, source: &str) -> String {
    let prefix: String = normalize_content(content)
        .chars()
        .take(SIGNATURE_PREFIX_CHARS)
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, SaveContext};
    use chrono::Utc;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new(
            content,
            &SaveContext::new("chat.openai.com", "https://chat.openai.com/c/1"),
            "conv",
            Analysis::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_jaccard_identity_and_symmetry() {
        assert_eq!(jaccard_similarity("a b c", "a b c"), Some(1.0));
        assert_eq!(
            jaccard_similarity("a b c", "b c d"),
            jaccard_similarity("b c d", "a b c")
        );
        assert_eq!(jaccard_similarity("a b c", "b c d"), Some(0.5));
    }

    #[test]
    fn test_jaccard_empty_inputs() {
        assert_eq!(jaccard_similarity("", "   "), None);
        assert_eq!(jaccard_similarity("", "word"), Some(0.0));
    }

    #[test]
    fn test_jaccard_is_case_insensitive() {
        assert_eq!(jaccard_similarity("Rust Tokio", "rust tokio"), Some(1.0));
    }

    #[test]
    fn test_near_duplicate_detected() {
        let base = "one two three four five six seven eight nine ten \
                    eleven twelve thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty";
        let variant = base.replace("twenty", "twentyone");
        // 19 shared words out of 21 distinct
        let similarity = jaccard_similarity(base, &variant).unwrap();
        assert!(similarity > DEFAULT_DUPLICATE_THRESHOLD);

        let detector = DuplicateDetector::default();
        assert!(detector.is_duplicate(&variant, &[record(base)]));
    }

    #[test]
    fn test_distinct_content_not_duplicate() {
        let detector = DuplicateDetector::default();
        let corpus = vec![record("Use EXPLAIN ANALYZE on slow Postgres queries")];
        assert!(!detector.is_duplicate("Pin your Docker base images by digest", &corpus));
        assert_eq!(detector.find_duplicate("", &corpus), None);
    }

    #[test]
    fn test_exact_match_found_by_index() {
        let detector = DuplicateDetector::default();
        let corpus = vec![record("first"), record("second")];
        assert_eq!(detector.find_duplicate("second", &corpus), Some(1));
    }

    #[test]
    fn test_signature_normalizes_whitespace_and_case() {
        let a = content_signature("Hello   World\n", "claude.ai");
        let b = content_signature("hello world", "claude.ai");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_signature("hello world", "chat.openai.com"));
    }

    #[test]
    fn test_signature_only_covers_prefix() {
        let prefix = "x".repeat(SIGNATURE_PREFIX_CHARS);
        let a = content_signature(&format!("{} tail one", prefix), "s");
        let b = content_signature(&format!("{} tail two", prefix), "s");
        assert_eq!(a, b);
    }
}
