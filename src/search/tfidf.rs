//! TF-IDF relevance scoring
//!
//! Classic term weighting over the stored corpus. Each document is the
//! record's content, summary and tags; each query term contributes
//! `tf * idf` and the sum is averaged over the query length.

use std::collections::HashMap;

use crate::search::preprocess::tokenize;
use crate::types::{MemoryRecord, SearchOptions, SearchResult};

/// Queries shorter than this (after trimming) skip scoring and browse recent records
pub const MIN_QUERY_CHARS: usize = 3;

/// Default cut-off below which scored documents are discarded
pub const DEFAULT_MIN_SCORE: f32 = 0.05;

/// A document index paired with its relevance score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument {
    pub index: usize,
    pub score: f32,
}

/// Term multiset of a single document
struct DocumentTerms {
    counts: HashMap<String, usize>,
    length: usize,
}

impl DocumentTerms {
    fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        let length = tokens.len();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        Self { counts, length }
    }

    fn count(&self, term: &str) -> usize {
        self.counts.get(term).copied().unwrap_or(0)
    }
}

/// TF-IDF scorer over memory records
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    min_score: f32,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE)
    }
}

impl RelevanceScorer {
    pub fn new(min_score: f32) -> Self {
        Self { min_score }
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Whether a query is too short to be worth scoring
    pub fn is_browse_query(query: &str) -> bool {
        query.trim().chars().count() < MIN_QUERY_CHARS
    }

    /// Raw score for every document, in input order
    ///
    /// Scores are in [0, 1]. A query term that no document contains has an
    /// IDF of zero and contributes nothing.
    pub fn score_texts(&self, query: &str, documents: &[String]) -> Vec<f32> {
        let query_terms = tokenize(query);
        let docs: Vec<DocumentTerms> = documents
            .iter()
            .map(|d| DocumentTerms::from_text(d))
            .collect();

        if docs.is_empty() {
            return Vec::new();
        }

        let total_docs = docs.len() as f64;
        let mut idf: HashMap<&str, f64> = HashMap::new();
        for term in &query_terms {
            idf.entry(term.as_str()).or_insert_with(|| {
                let containing = docs.iter().filter(|d| d.count(term) > 0).count();
                if containing == 0 {
                    0.0
                } else {
                    (total_docs / containing as f64).ln()
                }
            });
        }

        let query_len = query_terms.len().max(1) as f64;

        docs.iter()
            .map(|doc| {
                let doc_len = doc.length.max(1) as f64;
                let sum: f64 = query_terms
                    .iter()
                    .map(|term| {
                        let tf = doc.count(term) as f64 / doc_len;
                        tf * idf.get(term.as_str()).copied().unwrap_or(0.0)
                    })
                    .sum();
                ((sum / query_len) as f32).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Score records, drop those under the cut-off and sort best first
    ///
    /// Ties keep corpus order.
    pub fn rank(&self, query: &str, records: &[&MemoryRecord]) -> Vec<ScoredDocument> {
        let texts: Vec<String> = records.iter().map(|r| r.search_text()).collect();
        let mut scored: Vec<ScoredDocument> = self
            .score_texts(query, &texts)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(index, score)| ScoredDocument { index, score })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Full search over records given in most-recent-first order
    pub fn search(
        &self,
        query: &str,
        records: &[&MemoryRecord],
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let offset = options.offset();

        if Self::is_browse_query(query) {
            return records
                .iter()
                .skip(offset)
                .take(options.limit)
                .map(|r| SearchResult {
                    record: (*r).clone(),
                    score: None,
                })
                .collect();
        }

        self.rank(query, records)
            .into_iter()
            .skip(offset)
            .take(options.limit)
            .map(|s| SearchResult {
                record: records[s.index].clone(),
                score: Some(s.score),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, SaveContext};
    use chrono::{Duration, Utc};

    fn make_record(content: &str, age_minutes: i64) -> MemoryRecord {
        MemoryRecord::new(
            content,
            &SaveContext::new("test", "https://example.com"),
            "conv",
            Analysis::default(),
            Utc::now() - Duration::minutes(age_minutes),
        )
    }

    #[test]
    fn test_relevant_document_ranks_first() {
        let scorer = RelevanceScorer::default();
        let mut records = vec![make_record(
            "Python database tips: the python driver keeps the database pool warm, \
             and python code should close every database cursor",
            0,
        )];
        for i in 0..9 {
            records.push(make_record(
                &format!("Gardening journal entry {} about tomatoes and basil", i),
                i + 1,
            ));
        }
        let refs: Vec<&MemoryRecord> = records.iter().collect();

        let ranked = scorer.rank("python database error", &refs);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].index, 0);
        assert!(ranked[0].score > 0.05);
    }

    #[test]
    fn test_unknown_terms_score_zero() {
        let scorer = RelevanceScorer::default();
        let scores = scorer.score_texts(
            "zzzqqq",
            &["alpha beta gamma".to_string(), "delta epsilon".to_string()],
        );
        assert_eq!(scores, vec![0.0, 0.0]);
        assert!(scores.iter().all(|s| !s.is_nan()));
    }

    #[test]
    fn test_empty_document_does_not_divide_by_zero() {
        let scorer = RelevanceScorer::default();
        let scores = scorer.score_texts(
            "rust ownership",
            &["".to_string(), "rust ownership rules".to_string()],
        );
        assert_eq!(scores[0], 0.0);
        assert!(scores[1] > 0.0);
    }

    #[test]
    fn test_term_in_every_document_has_no_weight() {
        let scorer = RelevanceScorer::default();
        let scores = scorer.score_texts(
            "docker",
            &["docker compose".to_string(), "docker swarm".to_string()],
        );
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let scorer = RelevanceScorer::new(0.0);
        let records = vec![
            make_record("kubernetes operators", 0),
            make_record("unrelated gardening", 1),
            make_record("kubernetes operators", 2),
        ];
        let refs: Vec<&MemoryRecord> = records.iter().collect();
        let ranked = scorer.rank("kubernetes", &refs);
        assert_eq!(ranked[0].index, 0);
        assert_eq!(ranked[1].index, 2);
    }

    #[test]
    fn test_short_query_browses_recent() {
        let scorer = RelevanceScorer::default();
        let records: Vec<MemoryRecord> = (0..10)
            .map(|i| make_record(&format!("record number {}", i), i))
            .collect();
        let refs: Vec<&MemoryRecord> = records.iter().collect();

        let results = scorer.search("", &refs, &SearchOptions::new(5, 1));
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.score.is_none()));
        assert_eq!(results[0].record.id, records[0].id);
        assert_eq!(results[4].record.id, records[4].id);

        let page_two = scorer.search("ab", &refs, &SearchOptions::new(5, 2));
        assert_eq!(page_two[0].record.id, records[5].id);
    }
}
