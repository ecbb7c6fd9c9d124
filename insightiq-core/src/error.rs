//! Error types for InsightIQ operations

use thiserror::Error;

/// Schema store errors.
///
/// `Execution` is the only recoverable variant: it means the statement reached
/// the database and was rejected, so the generation loop can feed the message
/// back to the model. Everything else is fatal for the current request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("Pool error: {reason}")]
    Pool { reason: String },

    #[error("Schema introspection failed: {reason}")]
    Introspection { reason: String },

    #[error("Execution failed: {message}")]
    Execution { message: String },

    #[error("Statement rejected: only a single read-only SELECT is allowed")]
    NotReadOnly,
}

impl StoreError {
    /// Whether the generation loop may retry with a corrected statement.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Execution { .. } | StoreError::NotReadOnly)
    }

    /// The error text to feed back into a correction prompt.
    pub fn correction_text(&self) -> String {
        self.to_string()
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Embedding failed: {reason}")]
    EmbeddingFailed { reason: String },
}

/// Semantic index errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Index IO failed at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Index file at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Embedding vector errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: i32, got: i32 },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all InsightIQ errors.
#[derive(Debug, Clone, Error)]
pub enum InsightError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for InsightIQ operations.
pub type InsightResult<T> = Result<T, InsightError>;

// =============================================================================
// TESTS
// =============================================================================
