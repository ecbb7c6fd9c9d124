//! InsightIQ Core - Shared Data Types
//!
//! Pure data structures shared by every other crate: the schema map, query
//! results, attempt records, embedding vectors, configuration, and the error
//! taxonomy. No IO lives here.

pub mod config;
pub mod embedding;
pub mod error;
pub mod outcome;
pub mod schema;

pub use config::EngineConfig;
pub use embedding::EmbeddingVector;
pub use error::{
    ConfigError, IndexError, InsightError, InsightResult, LlmError, StoreError, VectorError,
};
pub use outcome::{AskOutcome, Attempt, AttemptFailure};
pub use schema::{QueryResult, SchemaMap};
