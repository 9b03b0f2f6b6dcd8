//! Persistence backend trait
//!
//! The store keeps the whole collection in memory and hands every mutation's
//! snapshot to a [`PersistenceBackend`]. Implementations only need to load
//! and replace the full collection:
//! - [`JsonFileBackend`](super::JsonFileBackend) for a JSON file on disk
//! - [`InMemoryBackend`](super::InMemoryBackend) for tests and embedding hosts
//!
//! # Design Principles
//!
//! 1. **Whole-collection writes**: `save_all` replaces everything, so a
//!    backend never has to reconcile partial updates.
//!
//! 2. **Error Handling**: All methods return `Result<T>` using the crate's
//!    error type. The store logs save failures and keeps going.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MemoryRecord;

#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Load the stored collection, most recent first; empty when nothing is stored
    async fn load(&self) -> Result<Vec<MemoryRecord>>;

    /// Replace the stored collection
    async fn save_all(&self, records: &[MemoryRecord]) -> Result<()>;

    /// Backend name for logs and stats
    fn backend_name(&self) -> &'static str;
}
