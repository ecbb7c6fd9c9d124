//! Gemini embedding provider implementation

use super::client::GeminiClient;
use super::types::{
    BatchEmbedContentsRequest, BatchEmbedContentsResponse, Content, EmbedContentRequest,
    EmbedContentResponse, Part,
};
use crate::providers::invalid_response;
use crate::EmbeddingProvider;
use async_trait::async_trait;
use insightiq_core::{EmbeddingVector, InsightResult};

/// Gemini embedding provider using text-embedding-004 or a custom model.
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: i32,
}

impl GeminiEmbeddingProvider {
    /// Create a new Gemini embedding provider.
    ///
    /// # Arguments
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g., "text-embedding-004")
    /// * `dimensions` - Embedding dimensions (768 for text-embedding-004)
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: i32) -> Self {
        Self {
            client: GeminiClient::new(api_key, 60),
            model: model.into(),
            dimensions,
        }
    }

    /// Create provider with the default text-embedding-004 model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, "text-embedding-004", 768)
    }

    /// Replace the underlying client (for tests against a local server).
    pub fn with_client(mut self, client: GeminiClient) -> Self {
        self.client = client;
        self
    }

    fn embed_request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> InsightResult<EmbeddingVector> {
        let path = format!("models/{}:embedContent", self.model);
        let response: EmbedContentResponse =
            self.client.request(&path, self.embed_request(text)).await?;

        if response.embedding.values.is_empty() {
            return Err(invalid_response("gemini", "Empty embedding in response"));
        }

        Ok(EmbeddingVector::new(
            response.embedding.values,
            self.model.clone(),
        ))
    }

    async fn embed_batch(&self, texts: &[&str]) -> InsightResult<Vec<EmbeddingVector>> {
        let request = BatchEmbedContentsRequest {
            requests: texts.iter().map(|t| self.embed_request(t)).collect(),
        };

        let path = format!("models/{}:batchEmbedContents", self.model);
        let response: BatchEmbedContentsResponse = self.client.request(&path, request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(invalid_response(
                "gemini",
                format!(
                    "Expected {} embeddings but got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|e| EmbeddingVector::new(e.values, self.model.clone()))
            .collect())
    }

    fn dimensions(&self) -> i32 {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for GeminiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEmbeddingProvider")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
