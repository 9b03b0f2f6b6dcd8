//! Worth-saving gate and fact extraction
//!
//! Decides whether scraped text merits storage at all, and pulls short
//! standalone facts out of longer answers:
//! - AI-response phrasing ("here's", "based on", "in summary", ...)
//! - List structure (bullets, numbered items, headings ending in `:`)
//! - Code fences and inline code
//! - URLs and technical vocabulary
//! - Sheer length

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::summarize::split_sentences;

/// Content shorter than this (trimmed, in characters) is never worth saving
pub const MIN_WORTH_CHARS: usize = 20;

/// Content longer than this is worth saving on length alone
pub const SUBSTANTIAL_CHARS: usize = 100;

/// Maximum number of facts returned by [`extract_facts`]
pub const MAX_FACTS: usize = 5;

static AI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bhere'?s\b",
        r"(?i)\bhere is\b",
        r"(?i)\bi can help\b",
        r"(?i)\blet me explain\b",
        r"(?i)\bbased on\b",
        r"(?i)\baccording to\b",
        r"(?i)\bin summary\b",
        r"(?i)\bto answer your question\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static STRUCTURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-•*]\s|^\s*\d+\.\s|:\s*$").unwrap());

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"```|`[^`\n]+`").unwrap());

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

static TECHNICAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(api|function|class|method|algorithm|database|server|client|framework|library|package|module|component|service|endpoint|request|response|authentication|authorization|encryption|caching|performance|optimization|debugging|testing|deployment|monitoring|logging)\b",
    )
    .unwrap()
});

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s+(.+)$").unwrap());

static BULLET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-•*]\s+(.+)$").unwrap());

static IMPORTANCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(important|key|note|remember|essential|critical)\b").unwrap()
});

/// Which worth-saving signals fired for a piece of content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSignals {
    /// Long enough to be considered at all
    pub long_enough: bool,
    pub ai_pattern: bool,
    pub structured: bool,
    pub code: bool,
    pub url: bool,
    pub technical: bool,
    pub substantial: bool,
}

impl CaptureSignals {
    /// Evaluate every signal against trimmed content
    pub fn detect(content: &str) -> Self {
        let content = content.trim();
        let len = content.chars().count();

        Self {
            long_enough: len >= MIN_WORTH_CHARS,
            ai_pattern: AI_PATTERNS.iter().any(|p| p.is_match(content)),
            structured: STRUCTURE_PATTERN.is_match(content),
            code: CODE_PATTERN.is_match(content),
            url: URL_PATTERN.is_match(content),
            technical: TECHNICAL_PATTERN.is_match(content),
            substantial: len > SUBSTANTIAL_CHARS,
        }
    }

    /// Long enough and at least one content signal
    pub fn is_worth_saving(&self) -> bool {
        self.long_enough
            && (self.ai_pattern
                || self.structured
                || self.code
                || self.url
                || self.technical
                || self.substantial)
    }

    /// Human-readable, comma-joined list of the signals that fired
    pub fn reason(&self) -> String {
        if !self.long_enough {
            return "Content too short".to_string();
        }

        let mut reasons = Vec::new();
        if self.ai_pattern {
            reasons.push("Contains AI response pattern");
        }
        if self.structured {
            reasons.push("Has structured content");
        }
        if self.code {
            reasons.push("Contains code");
        }
        if self.url {
            reasons.push("Contains URL");
        }
        if self.technical {
            reasons.push("Contains technical terms");
        }
        if self.substantial {
            reasons.push("Substantial length");
        }

        if reasons.is_empty() {
            "No valuable signals detected".to_string()
        } else {
            reasons.join(", ")
        }
    }
}

/// Heuristic worth-saving predicate
pub fn is_worth_saving(content: &str) -> bool {
    CaptureSignals::detect(content).is_worth_saving()
}

/// Explanation for the [`is_worth_saving`] decision
pub fn worth_saving_reason(content: &str) -> String {
    CaptureSignals::detect(content).reason()
}

/// Extract up to [`MAX_FACTS`] short facts
///
/// Candidates are gathered in this order: numbered list items, bulleted
/// items, then sentences mentioning an importance keyword. Exact repeats are
/// dropped.
pub fn extract_facts(content: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut facts = Vec::new();

    let numbered = NUMBERED_LINE
        .captures_iter(content)
        .map(|c| c[1].trim().to_string());
    let bulleted = BULLET_LINE
        .captures_iter(content)
        .map(|c| c[1].trim().to_string());
    let important = split_sentences(content)
        .into_iter()
        .filter(|s| IMPORTANCE_PATTERN.is_match(s))
        .map(str::to_string);

    for fact in numbered.chain(bulleted).chain(important) {
        if facts.len() >= MAX_FACTS {
            break;
        }
        if !fact.is_empty() && seen.insert(fact.clone()) {
            facts.push(fact);
        }
    }

    facts
}
