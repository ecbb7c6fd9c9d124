//! InsightIQ LLM - Provider Traits
//!
//! Provider-agnostic traits for text completion and embeddings, plus mock
//! implementations for testing. The Gemini implementation lives under
//! `providers::gemini`.

use async_trait::async_trait;
use insightiq_core::{EmbeddingVector, InsightResult, LlmError};
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod providers;

// ============================================================================
// COMPLETION PROVIDER TRAIT
// ============================================================================

/// Trait for text-generation providers.
///
/// Single-turn, prompt in, completion out. No streaming, no structured
/// output. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for the prompt.
    ///
    /// # Returns
    /// * `Ok(String)` - The raw completion text
    /// * `Err(InsightError::Llm)` - If the call fails
    async fn complete(&self, prompt: &str) -> InsightResult<String>;

    /// The model identifier for this provider (e.g., "gemini-flash-latest").
    fn model_id(&self) -> &str;
}

// ============================================================================
// EMBEDDING PROVIDER TRAIT
// ============================================================================

/// Trait for embedding providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> InsightResult<EmbeddingVector>;

    /// Generate embeddings for multiple texts, in input order.
    /// More efficient than calling embed() repeatedly.
    async fn embed_batch(&self, texts: &[&str]) -> InsightResult<Vec<EmbeddingVector>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> i32;

    /// The model identifier for this provider.
    fn model_id(&self) -> &str;
}

// ============================================================================
// MOCK PROVIDERS FOR TESTING
// ============================================================================

/// Scripted completion provider for tests.
///
/// Pops one scripted response per `complete` call and records every prompt it
/// receives so tests can assert on correction-prompt contents. An exhausted
/// script is a test bug and surfaces as `LlmError::InvalidResponse`.
pub struct MockCompletionProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for an all-success script.
    pub fn with_responses(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Prompts received so far, in call order.
    pub fn received_prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let next = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidResponse {
                    provider: "mock".to_string(),
                    reason: "script exhausted".to_string(),
                })
            });

        next.map_err(Into::into)
    }

    fn model_id(&self) -> &str {
        "mock-completion"
    }
}

/// Mock embedding provider for testing.
/// Generates deterministic embeddings based on text content.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dimensions: i32,
}

impl MockEmbeddingProvider {
    pub fn new(model_id: impl Into<String>, dimensions: i32) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions,
        }
    }

    /// Deterministic unit vector derived from the text bytes.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut data = vec![0.0f32; self.dimensions as usize];

        for (i, byte) in text.bytes().enumerate() {
            let idx = i % self.dimensions as usize;
            data[idx] += (byte as f32) / 255.0;
        }

        let norm: f32 = data.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut data {
                *x /= norm;
            }
        }

        data
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> InsightResult<EmbeddingVector> {
        let data = self.generate_embedding(text);
        Ok(EmbeddingVector::new(data, self.model_id.clone()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> InsightResult<Vec<EmbeddingVector>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> i32 {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Embedding provider that always fails, for outage-path tests.
#[derive(Debug, Clone)]
pub struct FailingEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _text: &str) -> InsightResult<EmbeddingVector> {
        Err(LlmError::EmbeddingFailed {
            reason: "provider unreachable".to_string(),
        }
        .into())
    }

    async fn embed_batch(&self, _texts: &[&str]) -> InsightResult<Vec<EmbeddingVector>> {
        Err(LlmError::EmbeddingFailed {
            reason: "provider unreachable".to_string(),
        }
        .into())
    }

    fn dimensions(&self) -> i32 {
        0
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
