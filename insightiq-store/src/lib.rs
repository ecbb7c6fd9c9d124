//! InsightIQ Store - Schema Provider
//!
//! Introspects the connected PostgreSQL database into a [`SchemaMap`] and
//! executes guarded read-only queries, returning tabular results with every
//! cell rendered to a display string.

use async_trait::async_trait;
use insightiq_core::{InsightResult, QueryResult, SchemaMap, StoreError};
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod config;
pub mod guard;
pub mod pg;

pub use config::StoreConfig;
pub use pg::PgSchemaStore;

// ============================================================================
// SCHEMA STORE TRAIT
// ============================================================================

/// The relational-store boundary.
///
/// Any SQL database reachable through a connection string can sit behind
/// this; the engine only ever sees the trait.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Introspect the connected database into table -> ordered column names.
    ///
    /// No side effects. Connection-level failures propagate as errors and
    /// are fatal for the request, never retried here.
    async fn get_schema(&self) -> InsightResult<SchemaMap>;

    /// Execute exactly one read-only statement.
    ///
    /// Execution failures come back as `StoreError::Execution` (or
    /// `NotReadOnly` from the guard) so the caller can distinguish "got
    /// data" from "got an error" by variant, not by string sniffing.
    async fn run_query(&self, sql: &str) -> InsightResult<QueryResult>;
}

// ============================================================================
// MOCK STORE FOR TESTING
// ============================================================================

/// Scripted schema store for tests.
///
/// Serves a fixed schema and pops one scripted result per `run_query` call,
/// recording the SQL it received.
pub struct MockSchemaStore {
    schema: SchemaMap,
    script: Mutex<VecDeque<Result<QueryResult, StoreError>>>,
    executed: Mutex<Vec<String>>,
}

impl MockSchemaStore {
    pub fn new(schema: SchemaMap, script: Vec<Result<QueryResult, StoreError>>) -> Self {
        Self {
            schema,
            script: Mutex::new(script.into()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// SQL statements received so far, in call order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().expect("sql log poisoned").clone()
    }
}

#[async_trait]
impl SchemaStore for MockSchemaStore {
    async fn get_schema(&self) -> InsightResult<SchemaMap> {
        Ok(self.schema.clone())
    }

    async fn run_query(&self, sql: &str) -> InsightResult<QueryResult> {
        self.executed
            .lock()
            .expect("sql log poisoned")
            .push(sql.to_string());

        let next = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(StoreError::Execution {
                    message: "mock script exhausted".to_string(),
                })
            });

        next.map_err(Into::into)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
