//! Content analysis dispatch
//!
//! Supports two analyzers behind one [`ContentAnalyzer`] trait:
//! - Rule-based local heuristics (always available)
//! - The LocalBrain NLP backend over HTTP - requires `remote` feature
//!
//! [`FallbackAnalyzer`] holds both and answers every call with the remote
//! backend when it is connected, falling back to the local rules on error.
//!
//! # Feature Flags
//!
//! - `remote`: Enables the HTTP backend client

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "remote")]
pub use remote::RemoteAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{LocalBrainError, Result};
use crate::intelligence::{auto_capture, classify, summarize, AutoTagger};
use crate::types::{Analysis, BackendConfig, Category};

/// Trait for content analyzers
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Analyzer name for logs
    fn name(&self) -> &str;

    /// Check the analyzer can serve requests
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn categorize(&self, content: &str) -> Result<Category>;

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String>;

    async fn extract_tags(&self, content: &str) -> Result<Vec<String>>;

    async fn extract_facts(&self, content: &str) -> Result<Vec<String>>;

    async fn is_worth_saving(&self, content: &str) -> Result<bool>;

    /// Category, summary and tags in one go
    async fn analyze(&self, content: &str, max_length: usize) -> Result<Analysis> {
        Ok(Analysis {
            category: self.categorize(content).await?,
            summary: self.summarize(content, max_length).await?,
            tags: self.extract_tags(content).await?,
        })
    }
}

/// Everything the analyzer can say about a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReport {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub facts: Vec<String>,
    pub worth_saving: bool,
    /// Comma-joined list of the local worth-saving signals
    pub reason: String,
}

/// Rule-based analyzer; never fails
#[derive(Debug, Clone, Default)]
pub struct LocalAnalyzer {
    tagger: AutoTagger,
}

impl LocalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tagger(tagger: AutoTagger) -> Self {
        Self { tagger }
    }
}

#[async_trait]
impl ContentAnalyzer for LocalAnalyzer {
    fn name(&self) -> &str {
        "local"
    }

    async fn categorize(&self, content: &str) -> Result<Category> {
        Ok(classify::classify(content))
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        Ok(summarize::summarize(content, max_length))
    }

    async fn extract_tags(&self, content: &str) -> Result<Vec<String>> {
        Ok(self.tagger.extract_tags(content))
    }

    async fn extract_facts(&self, content: &str) -> Result<Vec<String>> {
        Ok(auto_capture::extract_facts(content))
    }

    async fn is_worth_saving(&self, content: &str) -> Result<bool> {
        Ok(auto_capture::is_worth_saving(content))
    }
}

/// Connection state of the optional backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    /// No backend configured
    Disabled,
    /// Health check succeeded; remote answers are used
    Connected,
    /// Health checks exhausted or too many consecutive failures; local only
    Down,
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendStatus::Disabled => "disabled",
            BackendStatus::Connected => "connected",
            BackendStatus::Down => "down",
        };
        f.write_str(s)
    }
}

/// Remote-first analyzer with per-call fallback to local rules
pub struct FallbackAnalyzer {
    local: LocalAnalyzer,
    remote: Option<Arc<dyn ContentAnalyzer>>,
    config: BackendConfig,
    connected: AtomicBool,
    consecutive_failures: AtomicU32,
}

impl FallbackAnalyzer {
    /// Local rules only
    pub fn local_only() -> Self {
        Self {
            local: LocalAnalyzer::new(),
            remote: None,
            config: BackendConfig::default(),
            connected: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Wrap a remote analyzer; call [`connect`](Self::connect) before use
    pub fn with_remote(remote: Arc<dyn ContentAnalyzer>, config: BackendConfig) -> Self {
        Self {
            local: LocalAnalyzer::new(),
            remote: Some(remote),
            config,
            connected: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Build from backend settings, using the HTTP client when available
    pub fn from_config(config: Option<BackendConfig>) -> Result<Self> {
        match config {
            None => Ok(Self::local_only()),
            #[cfg(feature = "remote")]
            Some(config) => {
                let remote = RemoteAnalyzer::new(config.clone())?;
                Ok(Self::with_remote(Arc::new(remote), config))
            }
            #[cfg(not(feature = "remote"))]
            Some(config) => Err(LocalBrainError::Config(format!(
                "backend {} configured but the `remote` feature is disabled",
                config.base_url
            ))),
        }
    }

    pub fn status(&self) -> BackendStatus {
        match self.remote {
            None => BackendStatus::Disabled,
            Some(_) if self.connected.load(Ordering::SeqCst) => BackendStatus::Connected,
            Some(_) => BackendStatus::Down,
        }
    }

    /// Check backend health up to `max_retries` times with a fixed delay
    ///
    /// Returns whether the backend is connected afterwards. On exhaustion the
    /// backend stays down until [`reconnect`](Self::reconnect).
    pub async fn connect(&self) -> bool {
        let Some(remote) = self.remote.as_ref() else {
            return false;
        };

        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            match remote.health_check().await {
                Ok(()) => {
                    self.connected.store(true, Ordering::SeqCst);
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    tracing::info!(analyzer = remote.name(), attempt, "NLP backend connected");
                    return true;
                }
                Err(e) => {
                    tracing::debug!(attempt, attempts, error = %e, "NLP backend health check failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        tracing::warn!(
            base_url = %self.config.base_url,
            "NLP backend unavailable, using local analysis"
        );
        false
    }

    /// Re-check a backend previously marked down
    pub async fn reconnect(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.connect().await
    }

    fn active_remote(&self) -> Option<&Arc<dyn ContentAnalyzer>> {
        if self.connected.load(Ordering::SeqCst) {
            self.remote.as_ref()
        } else {
            None
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    fn record_failure(&self, operation: &str, error: &LocalBrainError) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(operation, failures, error = %error, "NLP backend call failed, falling back to local");
        if failures >= self.config.max_retries.max(1) {
            self.connected.store(false, Ordering::SeqCst);
            tracing::warn!(failures, "NLP backend marked down");
        }
    }

    /// Full report: analysis, facts and the worth-saving verdict
    pub async fn report(&self, content: &str, max_length: usize) -> Result<ContentReport> {
        Ok(ContentReport {
            analysis: self.analyze(content, max_length).await?,
            facts: self.extract_facts(content).await?,
            worth_saving: self.is_worth_saving(content).await?,
            reason: auto_capture::worth_saving_reason(content),
        })
    }
}

impl Default for FallbackAnalyzer {
    fn default() -> Self {
        Self::local_only()
    }
}

#[async_trait]
impl ContentAnalyzer for FallbackAnalyzer {
    fn name(&self) -> &str {
        match self.active_remote() {
            Some(remote) => remote.name(),
            None => self.local.name(),
        }
    }

    async fn categorize(&self, content: &str) -> Result<Category> {
        if let Some(remote) = self.active_remote() {
            match remote.categorize(content).await {
                Ok(category) => {
                    self.record_success();
                    return Ok(category);
                }
                Err(e) => self.record_failure("categorize", &e),
            }
        }
        self.local.categorize(content).await
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        if let Some(remote) = self.active_remote() {
            match remote.summarize(content, max_length).await {
                Ok(summary) => {
                    self.record_success();
                    return Ok(summarize::truncate_chars(&summary, max_length));
                }
                Err(e) => self.record_failure("summarize", &e),
            }
        }
        self.local.summarize(content, max_length).await
    }

    async fn extract_tags(&self, content: &str) -> Result<Vec<String>> {
        if let Some(remote) = self.active_remote() {
            match remote.extract_tags(content).await {
                Ok(tags) => {
                    self.record_success();
                    return Ok(normalize_tags(tags));
                }
                Err(e) => self.record_failure("extract_tags", &e),
            }
        }
        self.local.extract_tags(content).await
    }

    async fn extract_facts(&self, content: &str) -> Result<Vec<String>> {
        if let Some(remote) = self.active_remote() {
            match remote.extract_facts(content).await {
                Ok(facts) => {
                    self.record_success();
                    return Ok(facts);
                }
                Err(e) => self.record_failure("extract_facts", &e),
            }
        }
        self.local.extract_facts(content).await
    }

    async fn is_worth_saving(&self, content: &str) -> Result<bool> {
        if let Some(remote) = self.active_remote() {
            match remote.is_worth_saving(content).await {
                Ok(worth) => {
                    self.record_success();
                    return Ok(worth);
                }
                Err(e) => self.record_failure("is_worth_saving", &e),
            }
        }
        self.local.is_worth_saving(content).await
    }
}

/// Lowercase and deduplicate tags, keeping first appearance
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
