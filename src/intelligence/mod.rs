//! Rule-based content intelligence
//!
//! Provides:
//! - Category classification
//! - Extractive summaries
//! - Hashtag and technical-term tagging
//! - Worth-saving gate and fact extraction
//! - Near-duplicate detection and bulk dedup signatures
//! - Conversation grouping and append-merge

pub mod auto_capture;
pub mod auto_tagging;
pub mod classify;
pub mod conversation;
pub mod duplicates;
pub mod summarize;

pub use auto_capture::{
    extract_facts, is_worth_saving, worth_saving_reason, CaptureSignals, MAX_FACTS,
};
pub use auto_tagging::{extract_tags, AutoTagConfig, AutoTagger, TECHNICAL_TERMS};
pub use classify::{category_keywords, classify};
pub use conversation::{merged_content, ConversationGrouper, MERGE_SEPARATOR};
pub use duplicates::{
    content_signature, jaccard_similarity, normalize_content, signature, DuplicateDetector,
    DEFAULT_DUPLICATE_THRESHOLD,
};
pub use summarize::{summarize, truncate_chars, DEFAULT_SUMMARY_LENGTH};
