//! Search functionality for LocalBrain
//!
//! Implements:
//! - Text preprocessing (tokenize, stopwords)
//! - TF-IDF relevance scoring with a recent-records browse path
//! - Pre-scoring filters (category, source, date range, tags)
//! - Time-aware result cache with coarse invalidation

mod filter;
pub mod preprocess;
mod result_cache;
mod tfidf;

pub use filter::apply_filters;
pub use preprocess::{is_stopword, tokenize, STOPWORDS};
pub use result_cache::{
    CacheStats, CacheStatsResponse, CachedSearchResult, ResultCache, ResultCacheConfig,
};
pub use tfidf::{RelevanceScorer, ScoredDocument, DEFAULT_MIN_SCORE, MIN_QUERY_CHARS};
