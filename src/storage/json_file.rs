//! JSON file persistence
//!
//! The collection is written as a pretty-printed JSON array. Writes go to a
//! sibling temp file that is then renamed over the target, so a crash never
//! leaves a truncated file behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::backend::PersistenceBackend;
use crate::error::{LocalBrainError, Result};
use crate::types::MemoryRecord;

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a path that may start with `~` or contain `$VARS`
    pub fn from_user_path(path: &str) -> Result<Self> {
        let expanded = shellexpand::full(path)
            .map_err(|e| LocalBrainError::Config(format!("cannot expand {}: {}", path, e)))?;
        Ok(Self::new(expanded.into_owned()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "memories.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<MemoryRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No memory file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            LocalBrainError::Storage(format!(
                "corrupt memory file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save_all(&self, records: &[MemoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(records)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Analysis, SaveContext};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new(
            content,
            &SaveContext::new("claude.ai", "https://claude.ai/chat/1"),
            "conv",
            Analysis::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("none.json"));
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/dir/memories.json"));
        let records = vec![record("first memory"), record("second memory")];

        backend.save_all(&records).await.unwrap();
        let loaded = backend.load().await.unwrap();

        assert_eq!(loaded, records);
        assert!(!backend.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileBackend::new(&path).load().await.unwrap_err();
        assert!(matches!(err, LocalBrainError::Storage(_)));
    }

    #[test]
    fn test_user_path_expansion() {
        let backend = JsonFileBackend::from_user_path("/tmp/localbrain.json").unwrap();
        assert_eq!(backend.path(), Path::new("/tmp/localbrain.json"));
    }
}
