//! InsightIQ Engine - Query Generation Loop
//!
//! The orchestrator: narrows the schema via semantic retrieval, drives the
//! model to produce SQL, validates execution, and retries with error
//! feedback bounded by an attempt budget.
//!
//! `SELECT_TABLES -> GENERATE -> EXECUTE -> (SUCCESS | CORRECT -> GENERATE)
//! -> (SUCCESS | EXHAUSTED)`

pub mod engine;
pub mod prompt;

pub use engine::QueryEngine;
