//! LocalBrain - local memory engine for AI chat assistants
//!
//! Decides which scraped snippets are worth remembering, deduplicates and
//! merges them by conversation, ranks stored memories against a live query
//! with TF-IDF and manages growth and expiry of the collection.

pub mod analyzer;
pub mod clock;
pub mod error;
pub mod intelligence;
pub mod search;
pub mod storage;
pub mod types;

pub use analyzer::{BackendStatus, ContentAnalyzer, FallbackAnalyzer, LocalAnalyzer};
pub use error::{LocalBrainError, Result};
pub use storage::{JsonFileBackend, MemoryStore};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
