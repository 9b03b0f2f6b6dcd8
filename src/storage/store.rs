//! The memory store
//!
//! Owns the in-memory collection (most recent first), runs the save pipeline
//! (worth gate, duplicate check, conversation merge), serves searches through
//! the result cache and writes snapshots to a [`PersistenceBackend`].
//!
//! Save pipeline:
//!
//! ```text
//! RECEIVED -> WORTH_CHECK -> DUPLICATE_CHECK -> MERGE_CHECK -> {MERGED | CREATED} -> PERSISTED
//! ```

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::backend::PersistenceBackend;
use super::export::{export_records, parse_import};
use crate::analyzer::{BackendStatus, ContentAnalyzer, ContentReport, FallbackAnalyzer};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::intelligence::conversation::merged_content;
use crate::intelligence::{signature, ConversationGrouper, DuplicateDetector};
use crate::search::{
    apply_filters, CacheStatsResponse, RelevanceScorer, ResultCache, ResultCacheConfig,
};
use crate::types::{
    ExportFormat, ImportMode, ImportReport, MemoryRecord, SaveContext, SearchOptions,
    SearchResult, StoreConfig, FACT_MEMORY_TYPE,
};

/// Store statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub max_memories: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub backend: String,
    pub analyzer: BackendStatus,
    pub cache: CacheStatsResponse,
}

/// Relevance-scored memory store
pub struct MemoryStore {
    config: StoreConfig,
    records: RwLock<Vec<MemoryRecord>>,
    backend: Arc<dyn PersistenceBackend>,
    analyzer: FallbackAnalyzer,
    clock: Arc<dyn Clock>,
    cache: ResultCache,
    scorer: RelevanceScorer,
    detector: DuplicateDetector,
    grouper: ConversationGrouper,
    /// Advisory per-conversation locks serializing merge-check through persist
    conversation_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Serializes snapshot + write so the newest snapshot always lands last
    persist_lock: tokio::sync::Mutex<()>,
}

fn sort_recent_first(records: &mut [MemoryRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

impl MemoryStore {
    /// Create an empty store; call [`initialize`](Self::initialize) to load
    pub fn new(config: StoreConfig, backend: Arc<dyn PersistenceBackend>) -> Result<Self> {
        config.validate()?;

        let cache = ResultCache::new(ResultCacheConfig {
            ttl_seconds: config.cache_ttl_seconds,
            max_entries: config.cache_max_entries,
        });

        Ok(Self {
            scorer: RelevanceScorer::new(config.min_score),
            detector: DuplicateDetector::new(config.duplicate_threshold),
            grouper: ConversationGrouper::new(config.merge_window()),
            config,
            records: RwLock::new(Vec::new()),
            backend,
            analyzer: FallbackAnalyzer::local_only(),
            clock: Arc::new(SystemClock),
            cache,
            conversation_locks: DashMap::new(),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_analyzer(mut self, analyzer: FallbackAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &FallbackAnalyzer {
        &self.analyzer
    }

    /// Load persisted records, repair them, purge expired ones, connect the analyzer
    pub async fn initialize(&self) -> Result<()> {
        let loaded = self.backend.load().await?;
        let loaded_count = loaded.len();

        let mut seen = HashSet::new();
        let mut records: Vec<MemoryRecord> = loaded
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        let duplicate_ids = loaded_count - records.len();

        sort_recent_first(&mut records);
        let evicted = self.enforce_cap(&mut records);

        *self.records.write() = records;
        self.cache.invalidate_all();

        if duplicate_ids > 0 || evicted > 0 {
            tracing::info!(duplicate_ids, evicted, "Repaired loaded memories");
            self.persist().await;
        }

        let expired = self.cleanup_expired().await;
        let connected = self.analyzer.connect().await;

        tracing::info!(
            backend = self.backend.backend_name(),
            loaded = loaded_count,
            expired,
            total = self.len(),
            analyzer = %self.analyzer.status(),
            connected,
            "Memory store initialized"
        );
        Ok(())
    }

    /// Keep at most `max_memories`, dropping the tail; returns the number dropped
    fn enforce_cap(&self, records: &mut Vec<MemoryRecord>) -> usize {
        let over = records.len().saturating_sub(self.config.max_memories);
        records.truncate(self.config.max_memories);
        over
    }

    /// Write a snapshot; failures are logged and swallowed
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.records.read().clone();
        if let Err(e) = self.backend.save_all(&snapshot).await {
            tracing::error!(
                backend = self.backend.backend_name(),
                error = %e,
                "Failed to persist memories"
            );
        }
    }

    /// Invalidate the cache, then persist
    async fn commit(&self) {
        self.cache.invalidate_all();
        self.persist().await;
    }

    fn conversation_lock(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.conversation_locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Save content, returning the created or merged record
    ///
    /// Returns `Ok(None)` when the content is empty, not worth saving or a
    /// duplicate of a stored record.
    pub async fn save(&self, content: &str, context: &SaveContext) -> Result<Option<MemoryRecord>> {
        let content = content.trim();
        if content.is_empty() {
            tracing::debug!(stage = "received", "Ignoring empty content");
            return Ok(None);
        }

        if self.config.require_worth_saving && !self.analyzer.is_worth_saving(content).await? {
            tracing::debug!(
                stage = "worth_check",
                reason = %crate::intelligence::worth_saving_reason(content),
                "Content not worth saving"
            );
            return Ok(None);
        }

        let now = self.clock.now();
        let conversation_id = context
            .conversation_id
            .clone()
            .unwrap_or_else(|| self.grouper.conversation_id(&context.url, now));

        let lock = self.conversation_lock(&conversation_id);
        let result = {
            let _guard = lock.lock().await;
            self.save_in_conversation(content, context, &conversation_id, now)
                .await
        };
        drop(lock);
        self.conversation_locks
            .remove_if(&conversation_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn save_in_conversation(
        &self,
        content: &str,
        context: &SaveContext,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoryRecord>> {
        let merge_target = {
            let records = self.records.read();
            if let Some(index) = self.detector.find_duplicate(content, &records) {
                tracing::debug!(
                    stage = "duplicate_check",
                    existing = %records[index].id,
                    "Duplicate content, not saving"
                );
                return Ok(None);
            }
            self.grouper
                .find_merge_target(conversation_id, &records, now)
                .map(|i| (records[i].id.clone(), records[i].content.clone()))
        };

        if let Some((target_id, existing)) = merge_target {
            tracing::debug!(stage = "merge_check", target = %target_id, "Merging into conversation");
            let merged = merged_content(&existing, content);
            let analysis = self
                .analyzer
                .analyze(&merged, self.config.summary_max_length)
                .await?;

            let updated = {
                let mut records = self.records.write();
                if self.detector.find_duplicate(content, &records).is_some() {
                    tracing::debug!(stage = "duplicate_check", "Duplicate stored concurrently, not saving");
                    return Ok(None);
                }
                records
                    .iter()
                    .position(|r| r.id == target_id)
                    .map(|index| {
                        let mut record = records.remove(index);
                        self.grouper.merge_into(&mut record, content, analysis, now);
                        records.insert(0, record.clone());
                        record
                    })
            };

            match updated {
                Some(record) => {
                    self.commit().await;
                    tracing::debug!(stage = "persisted", id = %record.id, "Memory merged");
                    return Ok(Some(record));
                }
                None => {
                    tracing::debug!(target = %target_id, "Merge target deleted, creating new memory");
                }
            }
        }

        let analysis = self
            .analyzer
            .analyze(content, self.config.summary_max_length)
            .await?;
        let record = MemoryRecord::new(content, context, conversation_id, analysis, now);

        let evicted = {
            let mut records = self.records.write();
            // The analyzer await released the lock; another conversation may
            // have stored the same content meanwhile
            if self.detector.find_duplicate(content, &records).is_some() {
                tracing::debug!(stage = "duplicate_check", "Duplicate stored concurrently, not saving");
                return Ok(None);
            }
            records.insert(0, record.clone());
            self.enforce_cap(&mut records)
        };
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted oldest memories over cap");
        }

        self.commit().await;
        tracing::debug!(
            stage = "persisted",
            id = %record.id,
            category = %record.category,
            "Memory created"
        );
        Ok(Some(record))
    }

    /// Extract facts from content and save each as its own record
    ///
    /// Facts skip the worth gate and conversation merging; duplicates of
    /// stored records are still rejected.
    pub async fn save_facts(&self, content: &str, context: &SaveContext) -> Result<Vec<MemoryRecord>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let facts = self.analyzer.extract_facts(content).await?;
        let now = self.clock.now();
        let conversation_id = context
            .conversation_id
            .clone()
            .unwrap_or_else(|| self.grouper.conversation_id(&context.url, now));
        let fact_context = context.clone().with_type(FACT_MEMORY_TYPE);

        let mut saved = Vec::new();
        for fact in facts {
            let fact = fact.trim();
            if fact.is_empty() {
                continue;
            }
            let duplicate = self.detector.is_duplicate(fact, &self.records.read());
            if duplicate {
                tracing::debug!(fact, "Duplicate fact, not saving");
                continue;
            }

            let analysis = self
                .analyzer
                .analyze(fact, self.config.summary_max_length)
                .await?;
            let record = MemoryRecord::new(fact, &fact_context, conversation_id.as_str(), analysis, now);

            {
                let mut records = self.records.write();
                if self.detector.is_duplicate(fact, &records) {
                    tracing::debug!(fact, "Duplicate fact stored concurrently, not saving");
                    continue;
                }
                records.insert(0, record.clone());
                self.enforce_cap(&mut records);
            }
            saved.push(record);
        }

        if !saved.is_empty() {
            self.commit().await;
            tracing::info!(count = saved.len(), "Saved extracted facts");
        }
        Ok(saved)
    }

    /// Search stored memories
    ///
    /// Queries shorter than three characters return the most recent records
    /// unscored.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let now = self.clock.now();

        if let Some(results) = self.cache.get(query, options, now) {
            tracing::debug!(query, "Search cache hit");
            return Ok(results);
        }

        let generation = self.cache.generation();
        let results = {
            let records = self.records.read();
            let filtered = apply_filters(&records, &options.filters);
            self.scorer.search(query, &filtered, options)
        };

        if !self
            .cache
            .put_if_current(query, options, results.clone(), now, generation)
        {
            tracing::debug!(query, "Store changed during search, result not cached");
        }
        tracing::debug!(query, hits = results.len(), "Search complete");
        Ok(results)
    }

    pub fn get(&self, id: &str) -> Option<MemoryRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// All records, most recent first
    pub fn get_all(&self) -> Vec<MemoryRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let records = self.records.read();

        let mut by_category = BTreeMap::new();
        let mut by_source = BTreeMap::new();
        for record in records.iter() {
            *by_category.entry(record.category.to_string()).or_insert(0) += 1;
            *by_source.entry(record.source.clone()).or_insert(0) += 1;
        }

        StoreStats {
            total: records.len(),
            max_memories: self.config.max_memories,
            by_category,
            by_source,
            oldest: records.iter().map(|r| r.timestamp).min(),
            newest: records.iter().map(|r| r.timestamp).max(),
            backend: self.backend.backend_name().to_string(),
            analyzer: self.analyzer.status(),
            cache: self.cache.stats(),
        }
    }

    /// Delete by id; returns whether a record was removed
    pub async fn delete(&self, id: &str) -> bool {
        self.delete_where(|r| r.id == id).await > 0
    }

    /// Delete every listed id; returns the number removed
    pub async fn delete_many(&self, ids: &[String]) -> usize {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.delete_where(|r| ids.contains(r.id.as_str())).await
    }

    /// Delete every record matching `predicate`; returns the number removed
    pub async fn delete_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&MemoryRecord) -> bool,
    {
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|r| !predicate(r));
            before - records.len()
        };

        if removed > 0 {
            self.commit().await;
            tracing::debug!(removed, "Deleted memories");
        }
        removed
    }

    /// Delete everything; returns the number removed
    pub async fn clear_all(&self) -> usize {
        let removed = std::mem::take(&mut *self.records.write()).len();
        self.commit().await;
        tracing::info!(removed, "Cleared all memories");
        removed
    }

    /// Drop records sharing a bulk signature, keeping the first in canonical order
    pub async fn deduplicate(&self) -> usize {
        let removed = {
            let mut records = self.records.write();
            let mut seen = HashSet::new();
            let before = records.len();
            records.retain(|r| seen.insert(signature(r)));
            before - records.len()
        };

        if removed > 0 {
            self.commit().await;
        }
        tracing::info!(removed, "Deduplicated memories");
        removed
    }

    /// Purge records older than the retention horizon
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        self.cache.remove_expired(now);
        let Some(cutoff) = now.checked_sub_signed(self.config.retention()) else {
            return 0;
        };

        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|r| r.timestamp >= cutoff);
            before - records.len()
        };

        if removed > 0 {
            self.commit().await;
            tracing::info!(removed, retention_days = self.config.retention_days, "Purged expired memories");
        }
        removed
    }

    pub fn export(&self, format: ExportFormat) -> Result<String> {
        export_records(&self.records.read(), format)
    }

    /// Import a JSON export; validation failures leave the store untouched
    pub async fn import(&self, data: &str, mode: ImportMode) -> Result<ImportReport> {
        let incoming = parse_import(data)?;

        let report = {
            let mut records = self.records.write();
            let (mut next, imported, skipped) = match mode {
                ImportMode::Replace => {
                    let count = incoming.len();
                    (incoming, count, 0)
                }
                ImportMode::Merge => {
                    let existing: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
                    let total = incoming.len();
                    let mut next = records.clone();
                    next.extend(incoming.into_iter().filter(|r| !existing.contains(&r.id)));
                    let imported = next.len() - records.len();
                    (next, imported, total - imported)
                }
            };

            sort_recent_first(&mut next);
            let evicted = self.enforce_cap(&mut next);
            *records = next;

            ImportReport {
                imported,
                skipped,
                evicted,
            }
        };

        self.commit().await;
        tracing::info!(
            imported = report.imported,
            skipped = report.skipped,
            evicted = report.evicted,
            ?mode,
            "Imported memories"
        );
        Ok(report)
    }

    /// Run the analyzer without saving
    pub async fn analyze(&self, content: &str) -> Result<ContentReport> {
        self.analyzer
            .report(content.trim(), self.config.summary_max_length)
            .await
    }
}
