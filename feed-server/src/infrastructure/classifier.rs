use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Percentage scale, 0 to 100.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// External collaborator. Implementations classify raw image bytes;
/// any failure is fatal to the in-flight submission, there is no retry.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError>;
}

#[derive(Clone)]
pub struct HttpImageClassifier {
    client: Client,
    endpoint: String,
}

impl HttpImageClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ImageClassifier for HttpImageClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClassifierError::Status(resp.status()));
        }

        let classification = resp.json::<Classification>().await?;
        debug!(label = %classification.label, "image classified");
        Ok(classification)
    }
}
