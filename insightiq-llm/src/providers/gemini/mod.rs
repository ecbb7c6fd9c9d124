//! Google Gemini provider
//!
//! Both text generation (`generateContent`) and embeddings (`embedContent`)
//! go through the same REST API, authenticated with an API key.

mod client;
mod completion;
mod embedding;
mod types;

pub use client::GeminiClient;
pub use completion::GeminiCompletionProvider;
pub use embedding::GeminiEmbeddingProvider;
