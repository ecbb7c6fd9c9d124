//! Gemini completion provider implementation

use super::client::GeminiClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use crate::providers::invalid_response;
use crate::CompletionProvider;
use async_trait::async_trait;
use insightiq_core::InsightResult;

/// Gemini completion provider.
///
/// SQL generation wants determinism over creativity, so temperature stays
/// low by default.
pub struct GeminiCompletionProvider {
    client: GeminiClient,
    model: String,
    temperature: f32,
}

impl GeminiCompletionProvider {
    /// Create a new Gemini completion provider.
    ///
    /// # Arguments
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g., "gemini-flash-latest")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: GeminiClient::new(api_key, 60),
            model: model.into(),
            temperature: 0.2,
        }
    }

    /// Create provider with the default flash model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, "gemini-flash-latest")
    }

    /// Replace the underlying client (for tests against a local server).
    pub fn with_client(mut self, client: GeminiClient) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletionProvider {
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                max_output_tokens: None,
            }),
        };

        let path = format!("models/{}:generateContent", self.model);
        let response: GenerateContentResponse = self.client.request(&path, request).await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| invalid_response("gemini", "No candidates in response"))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(invalid_response("gemini", "Empty candidate content"));
        }

        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for GeminiCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiCompletionProvider")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}
