//! Automatic tagging for memories
//!
//! Tags come from two sources: explicit `#hashtags` in the content and a
//! fixed list of technical terms matched case-insensitively as substrings.
//! Custom keyword-to-tag mappings can be layered on top.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static HASHTAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());

/// Technical terms recognised as tags
pub const TECHNICAL_TERMS: &[&str] = &[
    "api",
    "function",
    "class",
    "method",
    "algorithm",
    "database",
    "server",
    "client",
    "framework",
    "library",
    "package",
    "module",
    "component",
    "service",
    "endpoint",
    "request",
    "response",
    "authentication",
    "authorization",
    "encryption",
    "caching",
    "performance",
    "optimization",
    "debugging",
    "testing",
    "deployment",
    "monitoring",
    "logging",
    "javascript",
    "python",
    "react",
    "node",
    "html",
    "css",
    "sql",
    "git",
    "docker",
    "aws",
    "cloud",
    "security",
];

/// Configuration for auto-tagging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTagConfig {
    /// Maximum number of tags kept per record
    pub max_tags: usize,
    /// Include `#hashtag` words
    pub enable_hashtags: bool,
    /// Include technical terms
    pub enable_terms: bool,
    /// Custom keyword-to-tag mappings
    pub keyword_mappings: HashMap<String, String>,
}

impl Default for AutoTagConfig {
    fn default() -> Self {
        Self {
            max_tags: 15,
            enable_hashtags: true,
            enable_terms: true,
            keyword_mappings: HashMap::new(),
        }
    }
}

/// Auto-tagging engine
#[derive(Debug, Clone, Default)]
pub struct AutoTagger {
    config: AutoTagConfig,
}

impl AutoTagger {
    /// Create a new auto-tagger
    pub fn new(config: AutoTagConfig) -> Self {
        Self { config }
    }

    /// Extract deduplicated, lowercase tags in order of first appearance
    pub fn extract_tags(&self, content: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut tags: Vec<String> = Vec::new();
        let mut push = |tag: String| {
            if !tag.is_empty() && seen.insert(tag.clone()) {
                tags.push(tag);
            }
        };

        if self.config.enable_hashtags {
            for cap in HASHTAG_PATTERN.captures_iter(content) {
                push(cap[1].to_lowercase());
            }
        }

        let content_lower = content.to_lowercase();

        if self.config.enable_terms {
            for term in TECHNICAL_TERMS {
                if content_lower.contains(term) {
                    push(term.to_string());
                }
            }
        }

        for (keyword, tag) in &self.config.keyword_mappings {
            if content_lower.contains(&keyword.to_lowercase()) {
                push(tag.to_lowercase());
            }
        }

        tags.truncate(self.config.max_tags);
        tags
    }

    /// Get configuration
    pub fn config(&self) -> &AutoTagConfig {
        &self.config
    }

    /// Add custom keyword mapping
    pub fn add_keyword_mapping(&mut self, keyword: impl Into<String>, tag: impl Into<String>) {
        self.config
            .keyword_mappings
            .insert(keyword.into(), tag.into());
    }
}

/// Extract tags with the default configuration
pub fn extract_tags(content: &str) -> Vec<String> {
    AutoTagger::default().extract_tags(content)
}
