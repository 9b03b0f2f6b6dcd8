//! HTTP client for the LocalBrain NLP backend
//!
//! Endpoints (JSON in, JSON out):
//! - `GET /health`
//! - `POST /api/categorize` `{content}` -> `{category: {category, confidence}}`
//! - `POST /api/summarize` `{content, max_length}` -> `{summary}`
//! - `POST /api/extract-tags` `{content}` -> `{tags}`
//! - `POST /api/extract-facts` `{content}` -> `{facts}`
//! - `POST /api/is-worth-saving` `{content}` -> `{worth_saving, reason}`

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ContentAnalyzer;
use crate::error::{LocalBrainError, Result};
use crate::types::{BackendConfig, Category};

#[derive(Debug, Deserialize)]
struct CategorizeResponse {
    category: CategoryPayload,
}

/// The backend nests the label and confidence under `category`; older
/// builds sent the bare label.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryPayload {
    Detailed { category: String },
    Label(String),
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FactsResponse {
    facts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WorthSavingResponse {
    worth_saving: bool,
}

/// Analyzer backed by the HTTP NLP service
pub struct RemoteAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteAnalyzer {
    /// Create a client with the configured per-request timeout
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LocalBrainError::Analyzer(format!(
                "NLP backend error {} on {}: {}",
                status, path, text
            )));
        }

        Ok(response.json().await?)
    }
}

/// Map a backend label onto the fixed category set; unknown labels are general
fn parse_category(label: &str) -> Category {
    label.parse().unwrap_or_default()
}

#[async_trait]
impl ContentAnalyzer for RemoteAnalyzer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LocalBrainError::BackendUnavailable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }

    async fn categorize(&self, content: &str) -> Result<Category> {
        let response: CategorizeResponse = self
            .post("/api/categorize", serde_json::json!({ "content": content }))
            .await?;

        let label = match response.category {
            CategoryPayload::Detailed { category } => category,
            CategoryPayload::Label(label) => label,
        };
        Ok(parse_category(&label))
    }

    async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        let response: SummaryResponse = self
            .post(
                "/api/summarize",
                serde_json::json!({ "content": content, "max_length": max_length }),
            )
            .await?;
        Ok(response.summary)
    }

    async fn extract_tags(&self, content: &str) -> Result<Vec<String>> {
        let response: TagsResponse = self
            .post("/api/extract-tags", serde_json::json!({ "content": content }))
            .await?;
        Ok(response.tags)
    }

    async fn extract_facts(&self, content: &str) -> Result<Vec<String>> {
        let response: FactsResponse = self
            .post("/api/extract-facts", serde_json::json!({ "content": content }))
            .await?;
        Ok(response.facts)
    }

    async fn is_worth_saving(&self, content: &str) -> Result<bool> {
        let response: WorthSavingResponse = self
            .post(
                "/api/is-worth-saving",
                serde_json::json!({ "content": content }),
            )
            .await?;
        Ok(response.worth_saving)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_is_general() {
        assert_eq!(parse_category("how-to"), Category::HowTo);
        assert_eq!(parse_category("Troubleshooting"), Category::Troubleshooting);
        assert_eq!(parse_category("poetry"), Category::General);
    }

    #[test]
    fn test_categorize_payload_shapes() {
        let nested: CategorizeResponse = serde_json::from_str(
            r#"{"success": true, "category": {"category": "code", "confidence": 0.9}}"#,
        )
        .unwrap();
        assert!(matches!(
            nested.category,
            CategoryPayload::Detailed { ref category, .. } if category == "code"
        ));

        let bare: CategorizeResponse =
            serde_json::from_str(r#"{"category": "example"}"#).unwrap();
        assert!(matches!(bare.category, CategoryPayload::Label(ref l) if l == "example"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let analyzer = RemoteAnalyzer::new(BackendConfig::new("http://127.0.0.1:5000/")).unwrap();
        assert_eq!(analyzer.base_url(), "http://127.0.0.1:5000");
    }

    #[tokio::test]
    async fn test_unreachable_backend_errors() {
        let analyzer = RemoteAnalyzer::new(BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        let err = analyzer.health_check().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
