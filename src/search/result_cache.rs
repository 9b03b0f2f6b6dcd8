//! Search result caching
//!
//! Provides caching for search results with:
//! - Exact lookup on (query, limit, page, filters)
//! - TTL-based expiration against the store clock
//! - Capacity bound with oldest-entry eviction
//! - Coarse invalidation: any write to the store clears every entry
//! - Generation check so results computed before an invalidation are never
//!   cached after it

use crate::types::{SearchOptions, SearchResult};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cached search result entry
#[derive(Debug)]
pub struct CachedSearchResult {
    /// The cached results
    pub results: Vec<SearchResult>,
    /// When this entry was created
    pub created_at: DateTime<Utc>,
}

impl CachedSearchResult {
    pub fn new(results: Vec<SearchResult>, created_at: DateTime<Utc>) -> Self {
        Self {
            results,
            created_at,
        }
    }

    /// Check if this entry is expired
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > ttl
    }
}

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    /// Time-to-live for cache entries (default: 5 minutes)
    pub ttl_seconds: u64,
    /// Maximum number of cache entries (default: 1000)
    pub max_entries: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300, // 5 minutes
            max_entries: 1000,
        }
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub invalidations: u64,
    pub evictions: u64,
    pub ttl_seconds: u64,
}

/// Time-aware search result cache
pub struct ResultCache {
    /// Cached entries keyed by hashed (query, options)
    entries: DashMap<String, Arc<CachedSearchResult>>,
    /// Configuration
    config: ResultCacheConfig,
    /// Cache statistics
    stats: CacheStats,
    /// Bumped by every invalidation
    generation: AtomicU64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(ResultCacheConfig::default())
    }
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
            generation: AtomicU64::new(0),
        }
    }

    fn ttl(&self) -> Duration {
        i64::try_from(self.config.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Current invalidation generation; capture it before reading the data
    /// that will be passed to [`put_if_current`](Self::put_if_current)
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Generate cache key from the normalized query and search options
    fn cache_key(query: &str, options: &SearchOptions) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        query.to_lowercase().trim().hash(&mut hasher);
        options.limit.hash(&mut hasher);
        options.page.max(1).hash(&mut hasher);
        options.filters.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Try to get cached results for a query
    pub fn get(
        &self,
        query: &str,
        options: &SearchOptions,
        now: DateTime<Utc>,
    ) -> Option<Vec<SearchResult>> {
        let cache_key = Self::cache_key(query, options);

        if let Some(entry) = self.entries.get(&cache_key) {
            if !entry.is_expired(self.ttl(), now) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.results.clone());
            }
            // Remove expired entry
            drop(entry);
            self.entries.remove(&cache_key);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store search results in cache
    pub fn put(
        &self,
        query: &str,
        options: &SearchOptions,
        results: Vec<SearchResult>,
        now: DateTime<Utc>,
    ) {
        let cache_key = Self::cache_key(query, options);
        self.insert(cache_key, Arc::new(CachedSearchResult::new(results, now)));
    }

    /// Store results only if no invalidation happened since `generation`
    ///
    /// Returns whether the entry was kept.
    pub fn put_if_current(
        &self,
        query: &str,
        options: &SearchOptions,
        results: Vec<SearchResult>,
        now: DateTime<Utc>,
        generation: u64,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }

        let cache_key = Self::cache_key(query, options);
        let entry = Arc::new(CachedSearchResult::new(results, now));
        self.insert(cache_key.clone(), entry.clone());

        // An invalidation that raced the insert either cleared it already or
        // is visible here
        if self.generation() != generation {
            self.entries
                .remove_if(&cache_key, |_, current| Arc::ptr_eq(current, &entry));
            return false;
        }
        true
    }

    fn insert(&self, cache_key: String, entry: Arc<CachedSearchResult>) {
        // Evict if at capacity
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&cache_key)
        {
            self.evict_oldest();
        }

        self.entries.insert(cache_key, entry);
    }

    /// Evict the oldest entry
    fn evict_oldest(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest_key {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove expired entries
    pub fn remove_expired(&self, now: DateTime<Utc>) {
        let ttl = self.ttl();
        self.entries.retain(|_, v| !v.is_expired(ttl, now));
    }

    /// Clear all cache entries
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let count = self.entries.len();
        self.entries.clear();
        self.stats
            .invalidations
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsResponse {
        CacheStatsResponse {
            entries: self.entries.len(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            hit_rate: self.stats.hit_rate(),
            invalidations: self.stats.invalidations.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            ttl_seconds: self.config.ttl_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, Category, MemoryRecord, SaveContext, SearchFilters};

    fn make_test_result(content: &str, score: f32) -> SearchResult {
        SearchResult {
            record: MemoryRecord::new(
                content,
                &SaveContext::new("test", "https://example.com"),
                "conv",
                Analysis::default(),
                Utc::now(),
            ),
            score: Some(score),
        }
    }

    #[test]
    fn test_cache_put_get() {
        let cache = ResultCache::default();
        let now = Utc::now();
        let options = SearchOptions::default();

        cache.put("test query", &options, vec![make_test_result("test", 0.9)], now);

        let cached = cache.get("test query", &options, now);
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().len(), 1);

        // Normalized query hits the same entry
        assert!(cache.get("  TEST query ", &options, now).is_some());
    }

    #[test]
    fn test_cache_miss() {
        let cache = ResultCache::default();
        assert!(cache
            .get("nonexistent", &SearchOptions::default(), Utc::now())
            .is_none());
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let cache = ResultCache::default();
        let now = Utc::now();
        let options = SearchOptions::default();
        cache.put("query", &options, vec![make_test_result("x", 0.5)], now);

        assert!(cache
            .get("query", &options, now + Duration::seconds(299))
            .is_some());
        assert!(cache
            .get("query", &options, now + Duration::seconds(301))
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = ResultCache::default();
        let now = Utc::now();
        cache.put("a", &SearchOptions::default(), vec![], now);
        cache.put("b", &SearchOptions::new(5, 2), vec![], now);
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();

        assert!(cache.get("a", &SearchOptions::default(), now).is_none());
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_results_from_before_invalidation_are_not_cached() {
        let cache = ResultCache::default();
        let now = Utc::now();
        let options = SearchOptions::default();

        let generation = cache.generation();
        // A write lands between the read and the put
        cache.invalidate_all();
        let kept = cache.put_if_current(
            "query",
            &options,
            vec![make_test_result("stale", 0.9)],
            now,
            generation,
        );

        assert!(!kept);
        assert!(cache.get("query", &options, now).is_none());

        let generation = cache.generation();
        assert!(cache.put_if_current(
            "query",
            &options,
            vec![make_test_result("fresh", 0.9)],
            now,
            generation,
        ));
        assert_eq!(
            cache.get("query", &options, now).unwrap()[0].record.content,
            "fresh"
        );
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = ResultCache::new(ResultCacheConfig {
            ttl_seconds: u64::MAX,
            max_entries: 10,
        });
        let now = Utc::now();
        let options = SearchOptions::default();
        cache.put("query", &options, vec![], now);
        assert!(cache
            .get("query", &options, now + Duration::days(365))
            .is_some());
    }

    #[test]
    fn test_different_options_different_cache() {
        let cache = ResultCache::default();
        let now = Utc::now();
        let page_one = SearchOptions::new(5, 1);
        let page_two = SearchOptions::new(5, 2);
        let code_only = SearchOptions::new(5, 1).with_filters(SearchFilters {
            category: Some(Category::Code),
            ..Default::default()
        });

        cache.put("query", &page_one, vec![make_test_result("one", 0.9)], now);
        cache.put("query", &page_two, vec![make_test_result("two", 0.8)], now);

        assert_eq!(
            cache.get("query", &page_one, now).unwrap()[0].record.content,
            "one"
        );
        assert_eq!(
            cache.get("query", &page_two, now).unwrap()[0].record.content,
            "two"
        );
        assert!(cache.get("query", &code_only, now).is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ResultCache::new(ResultCacheConfig {
            ttl_seconds: 300,
            max_entries: 2,
        });
        let now = Utc::now();
        let options = SearchOptions::default();
        cache.put("first", &options, vec![], now);
        cache.put("second", &options, vec![], now + Duration::seconds(1));
        cache.put("third", &options, vec![], now + Duration::seconds(2));

        let later = now + Duration::seconds(3);
        assert!(cache.get("first", &options, later).is_none());
        assert!(cache.get("third", &options, later).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_stats() {
        let cache = ResultCache::default();
        let now = Utc::now();
        let options = SearchOptions::default();

        // Miss
        cache.get("query", &options, now);

        // Put
        cache.put("query", &options, vec![make_test_result("test", 0.9)], now);

        // Hit
        cache.get("query", &options, now);
        cache.get("query", &options, now);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!(stats.hit_rate > 0.6);
    }
}
