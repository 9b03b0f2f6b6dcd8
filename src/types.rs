//! Core types for LocalBrain

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{LocalBrainError, Result};

/// Unique identifier for a memory record
pub type MemoryId = String;

/// Default `type` tag for records captured from a chat page
pub const DEFAULT_MEMORY_TYPE: &str = "conversation";

/// `type` tag for records produced by fact extraction
pub const FACT_MEMORY_TYPE: &str = "extracted_fact";

/// A single remembered snippet plus its derived metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Unique identifier (`{unix_millis}-{base36 tie-breaker}`)
    pub id: MemoryId,
    /// Trimmed text; only ever changed by a conversation merge
    pub content: String,
    /// Creation time, refreshed on merge
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Set only when the record absorbed a later save
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    /// Hostname or platform tag
    #[serde(default)]
    pub source: String,
    /// Originating page URL
    #[serde(default)]
    pub url: String,
    /// `url + floor(time / window)`
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub category: Category,
    /// Short preview, at most 150 characters by default
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Caller-supplied tag ("conversation", "extracted_fact", "user_selected", ...)
    #[serde(rename = "type", default = "default_memory_type")]
    pub memory_type: String,
}

fn default_memory_type() -> String {
    DEFAULT_MEMORY_TYPE.to_string()
}

/// Accept RFC 3339 strings as well as epoch milliseconds (as written by `Date.now()`)
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
        Raw::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
    }
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_timestamp")] DateTime<Utc>);

    Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(dt)| dt))
}

impl MemoryRecord {
    /// Build a fresh record from trimmed content, its capture context and analysis
    pub fn new(
        content: impl Into<String>,
        context: &SaveContext,
        conversation_id: impl Into<String>,
        analysis: Analysis,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(now),
            content: content.into(),
            timestamp: now,
            last_updated: None,
            source: context.source.clone(),
            url: context.url.clone(),
            conversation_id: conversation_id.into(),
            category: analysis.category,
            summary: analysis.summary,
            tags: analysis.tags,
            memory_type: context
                .memory_type
                .clone()
                .unwrap_or_else(default_memory_type),
        }
    }

    /// Text surface used for relevance scoring
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.content, self.summary, self.tags.join(" "))
    }
}

/// Generate a record id: creation millis plus a 9-character base36 tie-breaker
pub fn generate_id(now: DateTime<Utc>) -> MemoryId {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix)
}

/// Fixed category enumeration shared by local and remote analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Code,
    Troubleshooting,
    HowTo,
    Explanation,
    Comparison,
    Recommendation,
    Example,
    #[default]
    General,
}

impl Category {
    /// All categories in classification precedence order
    pub const ALL: [Category; 8] = [
        Category::Code,
        Category::Troubleshooting,
        Category::HowTo,
        Category::Explanation,
        Category::Comparison,
        Category::Recommendation,
        Category::Example,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Troubleshooting => "troubleshooting",
            Category::HowTo => "how-to",
            Category::Explanation => "explanation",
            Category::Comparison => "comparison",
            Category::Recommendation => "recommendation",
            Category::Example => "example",
            Category::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(|c: char| c == '_' || c == ' ', "-");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized || (normalized == "howto" && *c == Category::HowTo))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Capture context supplied by the scraper alongside raw content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveContext {
    /// Hostname or platform tag
    pub source: String,
    /// Page URL the content came from
    pub url: String,
    /// Caller metadata tag; defaults to "conversation"
    pub memory_type: Option<String>,
    /// Explicit conversation key; derived from `url` and time when absent
    pub conversation_id: Option<String>,
}

impl SaveContext {
    pub fn new(source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, memory_type: impl Into<String>) -> Self {
        self.memory_type = Some(memory_type.into());
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Derived metadata for a piece of content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub category: Category,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Filters applied before relevance scoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: Option<Category>,
    /// Case-insensitive substring of `source`
    pub source: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub date_to: Option<DateTime<Utc>>,
    /// Every listed tag must be present on the record
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.source.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.tags.is_empty()
    }
}

/// Options for a search call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Page size
    pub limit: usize,
    /// 1-based page number; 0 is treated as 1
    pub page: usize,
    #[serde(default)]
    pub filters: SearchFilters,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            page: 1,
            filters: SearchFilters::default(),
        }
    }
}

impl SearchOptions {
    pub fn new(limit: usize, page: usize) -> Self {
        Self {
            limit,
            page,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Offset of the first item on the requested page
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit)
    }
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: MemoryRecord,
    /// TF-IDF score in [0, 1]; `None` for the recent-records browse path
    pub score: Option<f32>,
}

/// Supported export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// How imported records combine with the existing collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add records whose id is not already present
    #[default]
    Merge,
    /// Discard the current collection
    Replace,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    /// Records dropped by the size cap after the import
    pub evicted: usize,
}

/// Longest accepted retention horizon (100 years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Longest accepted conversation window (one week)
pub const MAX_MERGE_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Longest accepted search cache lifetime (one week)
pub const MAX_CACHE_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of records kept (oldest evicted first)
    pub max_memories: usize,
    /// Retention horizon in days, measured from `timestamp`
    pub retention_days: i64,
    /// Conversation bucket and merge window length
    pub merge_window_minutes: i64,
    /// Jaccard similarity above which a save is a near-duplicate
    pub duplicate_threshold: f32,
    /// Scores below this are dropped from search results
    pub min_score: f32,
    /// Search cache time-to-live
    pub cache_ttl_seconds: u64,
    /// Search cache capacity
    pub cache_max_entries: usize,
    /// Maximum summary length in characters
    pub summary_max_length: usize,
    /// Run the worth-saving gate inside `save`
    pub require_worth_saving: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_memories: 1000,
            retention_days: 90,
            merge_window_minutes: 30,
            duplicate_threshold: 0.85,
            min_score: 0.05,
            cache_ttl_seconds: 300, // 5 minutes
            cache_max_entries: 1000,
            summary_max_length: 150,
            require_worth_saving: true,
        }
    }
}

impl StoreConfig {
    /// Load overrides from `LOCALBRAIN_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_memories: env_or("LOCALBRAIN_MAX_MEMORIES", defaults.max_memories)?,
            retention_days: env_or("LOCALBRAIN_EXPIRY_DAYS", defaults.retention_days)?,
            merge_window_minutes: env_or(
                "LOCALBRAIN_MERGE_WINDOW_MINUTES",
                defaults.merge_window_minutes,
            )?,
            duplicate_threshold: env_or(
                "LOCALBRAIN_SIMILARITY_THRESHOLD",
                defaults.duplicate_threshold,
            )?,
            min_score: env_or("LOCALBRAIN_MIN_SCORE", defaults.min_score)?,
            cache_ttl_seconds: env_or("LOCALBRAIN_CACHE_TTL", defaults.cache_ttl_seconds)?,
            cache_max_entries: env_or("LOCALBRAIN_CACHE_SIZE", defaults.cache_max_entries)?,
            summary_max_length: env_or(
                "LOCALBRAIN_SUMMARY_LENGTH",
                defaults.summary_max_length,
            )?,
            require_worth_saving: env_or(
                "LOCALBRAIN_REQUIRE_WORTH_SAVING",
                defaults.require_worth_saving,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.max_memories == 0 {
            errors.push("max_memories must be at least 1".to_string());
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            errors.push(format!("Invalid retention_days: {}", self.retention_days));
        }
        if !(1..=MAX_MERGE_WINDOW_MINUTES).contains(&self.merge_window_minutes) {
            errors.push(format!(
                "Invalid merge_window_minutes: {}",
                self.merge_window_minutes
            ));
        }
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            errors.push(format!(
                "Invalid duplicate_threshold: {}",
                self.duplicate_threshold
            ));
        }
        if self.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            errors.push(format!(
                "Invalid cache_ttl_seconds: {}",
                self.cache_ttl_seconds
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            errors.push(format!("Invalid min_score: {}", self.min_score));
        }
        if self.summary_max_length < 4 {
            errors.push(format!(
                "Summary length too small: {}",
                self.summary_max_length
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LocalBrainError::Config(errors.join("; ")))
        }
    }

    /// Saturates on values [`validate`](Self::validate) rejects
    pub fn merge_window(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.merge_window_minutes).unwrap_or(chrono::Duration::MAX)
    }

    /// Saturates on values [`validate`](Self::validate) rejects
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.retention_days).unwrap_or(chrono::Duration::MAX)
    }
}

/// Settings for the optional NLP backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Health check attempts, and consecutive call failures before giving up
    pub max_retries: u32,
    /// Fixed delay between health check attempts
    pub retry_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create config from environment variables; `None` when no backend URL is set
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(base_url) = std::env::var("LOCALBRAIN_BACKEND_URL") else {
            return Ok(None);
        };
        let defaults = Self::default();
        Ok(Some(Self {
            base_url,
            timeout_secs: env_or("LOCALBRAIN_COMPONENT_TIMEOUT", defaults.timeout_secs)?,
            max_retries: env_or("LOCALBRAIN_MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: env_or("LOCALBRAIN_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
        }))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LocalBrainError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        assert_eq!("how-to".parse::<Category>().unwrap(), Category::HowTo);
        assert_eq!("How To".parse::<Category>().unwrap(), Category::HowTo);
        assert_eq!(Category::HowTo.to_string(), "how-to");
        assert_eq!(
            serde_json::to_string(&Category::HowTo).unwrap(),
            "\"how-to\""
        );
        assert!("poetry".parse::<Category>().is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let now = Utc::now();
        let a = generate_id(now);
        let b = generate_id(now);
        assert_ne!(a, b);
        assert!(a.starts_with(&now.timestamp_millis().to_string()));
        assert_eq!(a.split('-').nth(1).unwrap().len(), 9);
    }

    #[test]
    fn test_record_deserializes_browser_shape() {
        let json = r#"{
            "id": "1700000000000-abc123xyz",
            "content": "Use EXPLAIN ANALYZE to inspect slow queries",
            "timestamp": 1700000000000,
            "source": "chat.openai.com",
            "type": "user_selected"
        }"#;
        let record: MemoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(record.category, Category::General);
        assert_eq!(record.memory_type, "user_selected");
        assert!(record.last_updated.is_none());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let now = Utc::now();
        let record = MemoryRecord::new(
            "content",
            &SaveContext::new("example.com", "https://example.com/c/1"),
            "https://example.com/c/1944",
            Analysis::default(),
            now,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("conversationId").is_some());
        assert!(value.get("lastUpdated").is_none());
        assert_eq!(value["type"], "conversation");
    }

    #[test]
    fn test_search_options_offset() {
        assert_eq!(SearchOptions::new(5, 0).offset(), 0);
        assert_eq!(SearchOptions::new(5, 1).offset(), 0);
        assert_eq!(SearchOptions::new(5, 3).offset(), 10);
    }

    #[test]
    fn test_config_validation() {
        assert!(StoreConfig::default().validate().is_ok());

        let bad = StoreConfig {
            max_memories: 0,
            duplicate_threshold: 1.5,
            ..Default::default()
        };
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("max_memories"));
        assert!(err.contains("duplicate_threshold"));
    }

    #[test]
    fn test_config_rejects_durations_out_of_range() {
        let bad = StoreConfig {
            retention_days: 1_000_000_000_000,
            merge_window_minutes: i64::MAX,
            cache_ttl_seconds: u64::MAX,
            ..Default::default()
        };
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("retention_days"));
        assert!(err.contains("merge_window_minutes"));
        assert!(err.contains("cache_ttl_seconds"));

        // Accessors never panic even on unvalidated input
        assert_eq!(bad.retention(), chrono::Duration::MAX);
        assert_eq!(bad.merge_window(), chrono::Duration::MAX);

        let edge = StoreConfig {
            retention_days: MAX_RETENTION_DAYS,
            merge_window_minutes: MAX_MERGE_WINDOW_MINUTES,
            cache_ttl_seconds: MAX_CACHE_TTL_SECONDS,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }
}
