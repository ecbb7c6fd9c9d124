//! The self-correcting query engine

use crate::prompt;
use insightiq_core::{
    AskOutcome, Attempt, AttemptFailure, EngineConfig, InsightError, InsightResult, SchemaMap,
};
use insightiq_index::TableIndex;
use insightiq_llm::CompletionProvider;
use insightiq_store::SchemaStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The retrieval-augmented self-correcting SQL generation loop.
///
/// All collaborators are injected through traits; nothing here owns a
/// connection, an HTTP client, or a file.
pub struct QueryEngine {
    store: Arc<dyn SchemaStore>,
    index: Arc<dyn TableIndex>,
    model: Arc<dyn CompletionProvider>,
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn SchemaStore>,
        index: Arc<dyn TableIndex>,
        model: Arc<dyn CompletionProvider>,
        config: EngineConfig,
    ) -> InsightResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            index,
            model,
            config,
        })
    }

    /// Answer a natural-language question with a tabular result.
    ///
    /// One sequential pass: select tables, then generate/execute/correct up
    /// to the attempt budget. Schema introspection failure is fatal and
    /// propagates; everything the loop can recover from is folded into the
    /// returned [`AskOutcome`].
    pub async fn ask(&self, question: &str) -> InsightResult<AskOutcome> {
        // Built fresh per request so a schema change needs no cache flush.
        let schema = self.store.get_schema().await?;
        let selected = self.select_tables(&schema, question).await;
        let initial = prompt::initial_prompt(&schema, &selected, question);

        let mut attempts: Vec<Attempt> = Vec::new();
        while (attempts.len() as u32) < self.config.max_attempts {
            if !attempts.is_empty() {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            let current = prompt::next_prompt(&initial, question, attempts.last());
            info!(
                attempt = attempts.len() + 1,
                budget = self.config.max_attempts,
                "generating SQL"
            );

            let raw = match self.model.complete(&current).await {
                Ok(raw) => raw,
                Err(err) => {
                    // No SQL was produced; this still consumes the attempt
                    // and the same prompt is retried.
                    warn!(error = %err, "model call failed");
                    attempts.push(Attempt {
                        prompt: current,
                        failure: AttemptFailure::ModelCall {
                            reason: err.to_string(),
                        },
                    });
                    continue;
                }
            };

            let sql = prompt::clean_sql(&raw);
            if prompt::is_unanswerable(&sql) {
                // Terminal on first sight; does not consume a retry.
                info!("model declared the question unanswerable");
                return Ok(AskOutcome::NotUnderstood);
            }

            info!(%sql, "executing generated SQL");
            match self.store.run_query(&sql).await {
                Ok(result) => {
                    info!(rows = result.len(), "query succeeded");
                    return Ok(AskOutcome::Answer(result));
                }
                Err(InsightError::Store(store_err)) if store_err.is_recoverable() => {
                    warn!(error = %store_err, "generated SQL failed");
                    attempts.push(Attempt {
                        prompt: current,
                        failure: AttemptFailure::Execution {
                            sql,
                            error: store_err.correction_text(),
                        },
                    });
                }
                Err(fatal) => return Err(fatal),
            }
        }

        warn!(
            attempts = attempts.len(),
            "attempt budget exhausted without valid SQL"
        );
        Ok(AskOutcome::RetriesExhausted { attempts })
    }

    /// SELECT_TABLES: semantic retrieval with a full-schema safety net.
    ///
    /// Empty or unusable retrieval falls back to every table - a retrieval
    /// outage must degrade to bigger prompts, never to an unusable system.
    async fn select_tables(&self, schema: &SchemaMap, question: &str) -> Vec<String> {
        let relevant = self
            .index
            .relevant_tables(question, self.config.max_relevant_tables)
            .await;

        let usable: Vec<String> = relevant
            .into_iter()
            .filter(|table| schema.contains_key(table))
            .collect();

        if usable.is_empty() {
            debug!("no retrieval guidance, using full schema");
            schema.keys().cloned().collect()
        } else {
            debug!(tables = ?usable, "retrieval narrowed schema");
            usable
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use insightiq_core::{LlmError, QueryResult, StoreError};
    use insightiq_llm::MockCompletionProvider;
    use insightiq_store::MockSchemaStore;

    /// Index fake returning a fixed table list.
    struct StaticTableIndex {
        tables: Vec<String>,
    }

    impl StaticTableIndex {
        fn returning(tables: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tables: tables.iter().map(|t| t.to_string()).collect(),
            })
        }

        fn empty() -> Arc<Self> {
            Self::returning(&[])
        }
    }

    #[async_trait]
    impl TableIndex for StaticTableIndex {
        async fn index_schema(&self, schema: &SchemaMap) -> InsightResult<usize> {
            Ok(schema.len())
        }

        async fn relevant_tables(&self, _question: &str, n: usize) -> Vec<String> {
            self.tables.iter().take(n).cloned().collect()
        }
    }

    fn chinook_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert(
            "Customer".to_string(),
            vec!["CustomerId".to_string(), "FirstName".to_string(), "LastName".to_string()],
        );
        schema.insert(
            "Employee".to_string(),
            vec!["EmployeeId".to_string(), "FirstName".to_string(), "LastName".to_string()],
        );
        schema.insert(
            "Invoice".to_string(),
            vec!["InvoiceId".to_string(), "Total".to_string()],
        );
        schema
    }

    fn top_customers_result() -> QueryResult {
        QueryResult::new(
            vec!["FirstName".to_string()],
            vec![
                vec!["Ada".to_string()],
                vec!["Grace".to_string()],
                vec!["Linus".to_string()],
            ],
        )
    }

    fn engine(
        store: Arc<MockSchemaStore>,
        index: Arc<dyn TableIndex>,
        model: Arc<MockCompletionProvider>,
    ) -> QueryEngine {
        QueryEngine::new(store, index, model, EngineConfig::without_delay()).unwrap()
    }

    #[tokio::test]
    async fn answers_on_first_valid_attempt() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![Ok(top_customers_result())],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT FirstName FROM Customer ORDER BY CustomerId LIMIT 3",
        ]));
        let engine = engine(
            store.clone(),
            StaticTableIndex::returning(&["Customer"]),
            model,
        );

        let outcome = engine.ask("Top 3 customers").await.unwrap();
        match outcome {
            AskOutcome::Answer(result) => {
                assert_eq!(result.columns, vec!["FirstName"]);
                assert!(result.len() <= 3);
            }
            other => panic!("expected Answer, got {:?}", other),
        }
        assert_eq!(store.executed_sql().len(), 1);
    }

    #[tokio::test]
    async fn correction_prompt_carries_database_error() {
        let error_text = "column \"First_Name\" does not exist";
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![
                Err(StoreError::Execution {
                    message: error_text.to_string(),
                }),
                Ok(QueryResult::new(
                    vec!["full_name".to_string()],
                    vec![vec!["Ada Lovelace".to_string()]],
                )),
            ],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT First_Name || ' ' || LastName AS full_name FROM Employee",
            "SELECT FirstName || ' ' || LastName AS full_name FROM Employee",
        ]));
        let engine = engine(
            store.clone(),
            StaticTableIndex::returning(&["Employee"]),
            model.clone(),
        );

        let outcome = engine
            .ask("Show me the full name of all employees")
            .await
            .unwrap();
        assert!(outcome.is_answer());

        let prompts = model.received_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains(error_text));
        assert!(prompts[1].contains("SELECT First_Name"));
        assert_eq!(store.executed_sql().len(), 2);
    }

    #[tokio::test]
    async fn sentinel_short_circuits_without_retries() {
        let store = Arc::new(MockSchemaStore::new(chinook_schema(), vec![]));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "ERROR: Cannot answer",
        ]));
        let engine = engine(store.clone(), StaticTableIndex::empty(), model.clone());

        let outcome = engine.ask("What is the meaning of life?").await.unwrap();
        assert_eq!(outcome, AskOutcome::NotUnderstood);
        assert_eq!(
            outcome.message().unwrap(),
            "AI could not understand the question."
        );

        // One model call, nothing executed, no correction attempts burned.
        assert_eq!(model.received_prompts().len(), 1);
        assert!(store.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_after_three_failed_attempts() {
        let failure = || {
            Err(StoreError::Execution {
                message: "relation \"Sales\" does not exist".to_string(),
            })
        };
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![failure(), failure(), failure()],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT * FROM Sales",
            "SELECT * FROM Sales",
            "SELECT * FROM Sales",
        ]));
        let engine = engine(store.clone(), StaticTableIndex::empty(), model.clone());

        let outcome = engine.ask("Total sales?").await.unwrap();
        match &outcome {
            AskOutcome::RetriesExhausted { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts.iter().all(|a| a.sql().is_some()));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(
            outcome.message().unwrap(),
            "Failed to generate valid SQL after 3 attempts."
        );
        assert_eq!(model.received_prompts().len(), 3);
    }

    #[tokio::test]
    async fn empty_retrieval_uses_full_schema() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![Ok(top_customers_result())],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT FirstName FROM Customer LIMIT 3",
        ]));
        let engine = engine(store, StaticTableIndex::empty(), model.clone());

        engine.ask("Top 3 customers").await.unwrap();

        let prompt = &model.received_prompts()[0];
        for table in ["Customer", "Employee", "Invoice"] {
            assert!(prompt.contains(&format!("Table {}", table)), "{}", table);
        }
    }

    #[tokio::test]
    async fn retrieval_narrows_prompt_to_selected_tables() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![Ok(top_customers_result())],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT FirstName FROM Customer LIMIT 3",
        ]));
        let engine = engine(
            store,
            StaticTableIndex::returning(&["Customer", "Invoice"]),
            model.clone(),
        );

        engine.ask("Top 3 customers by spend").await.unwrap();

        let prompt = &model.received_prompts()[0];
        assert!(prompt.contains("Table Customer"));
        assert!(prompt.contains("Table Invoice"));
        assert!(!prompt.contains("Table Employee"));
    }

    #[tokio::test]
    async fn retrieved_tables_missing_from_schema_fall_back_to_full_schema() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![Ok(top_customers_result())],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "SELECT FirstName FROM Customer LIMIT 3",
        ]));
        // The index is stale: it names a table that no longer exists.
        let engine = engine(
            store,
            StaticTableIndex::returning(&["DroppedTable"]),
            model.clone(),
        );

        engine.ask("Top customers").await.unwrap();
        let prompt = &model.received_prompts()[0];
        assert!(prompt.contains("Table Customer"));
        assert!(prompt.contains("Table Employee"));
    }

    #[tokio::test]
    async fn model_failure_consumes_attempt_and_retries_same_prompt() {
        let store = Arc::new(MockSchemaStore::new(chinook_schema(), vec![]));
        let model_down = || {
            Err(LlmError::RequestFailed {
                provider: "gemini".to_string(),
                status: 503,
                message: "overloaded".to_string(),
            })
        };
        let model = Arc::new(MockCompletionProvider::new(vec![
            model_down(),
            model_down(),
            model_down(),
        ]));
        let engine = engine(store.clone(), StaticTableIndex::empty(), model.clone());

        let outcome = engine.ask("Top 3 customers").await.unwrap();
        match outcome {
            AskOutcome::RetriesExhausted { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts.iter().all(|a| a.sql().is_none()));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }

        // The budget bounds the loop even when no SQL is ever produced, and
        // with no failed SQL to correct the same prompt is re-sent.
        let prompts = model.received_prompts();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0], prompts[1]);
        assert_eq!(prompts[1], prompts[2]);
        assert!(store.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn model_failure_after_execution_failure_keeps_correction_prompt() {
        let error_text = "column \"total\" does not exist";
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![
                Err(StoreError::Execution {
                    message: error_text.to_string(),
                }),
                Ok(top_customers_result()),
            ],
        ));
        let model = Arc::new(MockCompletionProvider::new(vec![
            Ok("SELECT total FROM Invoice".to_string()),
            Err(LlmError::RequestFailed {
                provider: "gemini".to_string(),
                status: 503,
                message: "overloaded".to_string(),
            }),
            Ok("SELECT Total FROM Invoice".to_string()),
        ]));
        let engine = engine(store.clone(), StaticTableIndex::empty(), model.clone());

        let outcome = engine.ask("Total invoice amounts").await.unwrap();
        assert!(outcome.is_answer());

        // The third attempt re-sends the correction prompt the failed call
        // was given instead of falling back to the initial prompt.
        let prompts = model.received_prompts();
        assert_eq!(prompts.len(), 3);
        assert_ne!(prompts[0], prompts[1]);
        assert_eq!(prompts[1], prompts[2]);
        assert!(prompts[2].contains(error_text));
        assert!(prompts[2].contains("SELECT total FROM Invoice"));
    }

    #[tokio::test]
    async fn markdown_fences_are_stripped_before_execution() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![Ok(top_customers_result())],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "```sql\nSELECT FirstName FROM Customer LIMIT 3\n```",
        ]));
        let engine = engine(store.clone(), StaticTableIndex::empty(), model);

        engine.ask("Top 3 customers").await.unwrap();
        assert_eq!(
            store.executed_sql(),
            vec!["SELECT FirstName FROM Customer LIMIT 3"]
        );
    }

    #[tokio::test]
    async fn non_select_sql_is_rejected_and_corrected() {
        let store = Arc::new(MockSchemaStore::new(
            chinook_schema(),
            vec![
                Err(StoreError::NotReadOnly),
                Ok(top_customers_result()),
            ],
        ));
        let model = Arc::new(MockCompletionProvider::with_responses(&[
            "DELETE FROM Customer",
            "SELECT FirstName FROM Customer LIMIT 3",
        ]));
        let engine = engine(store, StaticTableIndex::empty(), model.clone());

        let outcome = engine.ask("Top 3 customers").await.unwrap();
        assert!(outcome.is_answer());
        assert!(model.received_prompts()[1].contains("read-only"));
    }

    #[tokio::test]
    async fn schema_introspection_failure_is_fatal() {
        struct BrokenStore;

        #[async_trait]
        impl SchemaStore for BrokenStore {
            async fn get_schema(&self) -> InsightResult<SchemaMap> {
                Err(StoreError::Connection {
                    reason: "connection refused".to_string(),
                }
                .into())
            }

            async fn run_query(&self, _sql: &str) -> InsightResult<QueryResult> {
                unreachable!("run_query must not be called when introspection fails")
            }
        }

        let model = Arc::new(MockCompletionProvider::with_responses(&[]));
        let engine = QueryEngine::new(
            Arc::new(BrokenStore),
            StaticTableIndex::empty(),
            model,
            EngineConfig::without_delay(),
        )
        .unwrap();

        let err = engine.ask("anything").await.unwrap_err();
        assert!(matches!(
            err,
            InsightError::Store(StoreError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let store = Arc::new(MockSchemaStore::new(chinook_schema(), vec![]));
        let model = Arc::new(MockCompletionProvider::with_responses(&[]));
        let config = EngineConfig {
            max_attempts: 0,
            ..EngineConfig::without_delay()
        };

        assert!(QueryEngine::new(store, StaticTableIndex::empty(), model, config).is_err());
    }
}
