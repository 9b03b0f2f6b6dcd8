//! Error types for LocalBrain

use thiserror::Error;

/// Result type alias for LocalBrain operations
pub type Result<T> = std::result::Result<T, LocalBrainError>;

/// Main error type for LocalBrain
#[derive(Error, Debug)]
pub enum LocalBrainError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Memory not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid import data: {0}")]
    InvalidImport(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("NLP backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(feature = "remote")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(not(feature = "remote"))]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocalBrainError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocalBrainError::Http(_)
                | LocalBrainError::BackendUnavailable(_)
                | LocalBrainError::Io(_)
        )
    }

    /// Short machine-readable code, used by the CLI for exit reporting
    pub fn code(&self) -> &'static str {
        match self {
            LocalBrainError::Storage(_) => "storage",
            LocalBrainError::NotFound(_) => "not_found",
            LocalBrainError::InvalidInput(_) => "invalid_input",
            LocalBrainError::InvalidImport(_) => "invalid_import",
            LocalBrainError::Analyzer(_) => "analyzer",
            LocalBrainError::BackendUnavailable(_) => "backend_unavailable",
            LocalBrainError::Serialization(_) => "serialization",
            LocalBrainError::Io(_) => "io",
            LocalBrainError::Http(_) => "http",
            LocalBrainError::Config(_) => "config",
            LocalBrainError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LocalBrainError::BackendUnavailable("down".into()).is_retryable());
        assert!(!LocalBrainError::InvalidImport("not an array".into()).is_retryable());
        assert!(!LocalBrainError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LocalBrainError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            LocalBrainError::InvalidImport("x".into()).to_string(),
            "Invalid import data: x"
        );
    }
}
