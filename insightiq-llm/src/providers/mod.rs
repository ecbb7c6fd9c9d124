//! LLM provider implementations
//!
//! Concrete implementations of the CompletionProvider and EmbeddingProvider
//! traits. Gemini is the only wired provider; the trait seam keeps the rest
//! of the system indifferent to that.

use insightiq_core::{InsightError, LlmError};

pub mod gemini;

pub use gemini::{GeminiClient, GeminiCompletionProvider, GeminiEmbeddingProvider};

pub(crate) fn request_failed(
    provider: &str,
    status: i32,
    message: impl Into<String>,
) -> InsightError {
    InsightError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> InsightError {
    InsightError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> InsightError {
    InsightError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}
