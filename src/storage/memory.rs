//! In-process persistence for tests and embedding hosts

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::backend::PersistenceBackend;
use crate::error::{LocalBrainError, Result};
use crate::types::MemoryRecord;

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: Mutex<Vec<MemoryRecord>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    /// Latency injected into upcoming saves, one entry per call
    save_delays: Mutex<VecDeque<Duration>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-populated collection
    pub fn with_records(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// Copy of what was last saved
    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.records.lock().clone()
    }

    /// Number of successful `save_all` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail, simulating a full disk
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Delay the next not-yet-delayed save by `delay`, simulating slow storage
    pub fn push_save_delay(&self, delay: Duration) {
        self.save_delays.lock().push_back(delay);
    }
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn load(&self) -> Result<Vec<MemoryRecord>> {
        Ok(self.records.lock().clone())
    }

    async fn save_all(&self, records: &[MemoryRecord]) -> Result<()> {
        let delay = self.save_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LocalBrainError::Storage("quota exceeded".to_string()));
        }
        *self.records.lock() = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
