//! PostgreSQL-backed schema store

use crate::guard::ensure_read_only;
use crate::SchemaStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::Pool;
use insightiq_core::{InsightResult, QueryResult, SchemaMap, StoreError};
use rust_decimal::Decimal;
use tokio_postgres::types::Type;
use tokio_postgres::Row;
use tracing::debug;

/// Table/column introspection over `information_schema`, ordinal order.
const SCHEMA_QUERY: &str = "\
    SELECT table_name, column_name \
    FROM information_schema.columns \
    WHERE table_schema = 'public' \
    ORDER BY table_name, ordinal_position";

/// Schema store over a deadpool-postgres connection pool.
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: Pool,
}

impl PgSchemaStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> InsightResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StoreError::Pool {
                reason: format!("Failed to get connection: {}", e),
            }
            .into()
        })
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn get_schema(&self) -> InsightResult<SchemaMap> {
        let client = self.client().await?;
        let rows = client
            .query(SCHEMA_QUERY, &[])
            .await
            .map_err(|e| StoreError::Introspection {
                reason: e.to_string(),
            })?;

        let mut schema = SchemaMap::new();
        for row in rows {
            let table: String = row.get(0);
            let column: String = row.get(1);
            schema.entry(table).or_insert_with(Vec::new).push(column);
        }

        debug!(tables = schema.len(), "introspected schema");
        Ok(schema)
    }

    async fn run_query(&self, sql: &str) -> InsightResult<QueryResult> {
        ensure_read_only(sql)?;

        let client = self.client().await?;

        // Prepare first so column names are known even for zero-row results.
        let statement = client.prepare(sql).await.map_err(map_query_error)?;
        let rows = client
            .query(&statement, &[])
            .await
            .map_err(map_query_error)?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rendered = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|idx| render_cell(row, idx))
                    .collect()
            })
            .collect();

        Ok(QueryResult::new(columns, rendered))
    }
}

/// Map a query-time error to the store taxonomy.
///
/// Errors the database itself reported (bad column, syntax error) become
/// `Execution` so the generation loop can feed the message back to the
/// model; transport-level failures stay fatal.
fn map_query_error(err: tokio_postgres::Error) -> insightiq_core::InsightError {
    match err.as_db_error() {
        Some(db_err) => StoreError::Execution {
            message: db_err.message().to_string(),
        }
        .into(),
        None => StoreError::Connection {
            reason: err.to_string(),
        }
        .into(),
    }
}

/// Render one cell to its display string. NULL renders as empty string;
/// types without a mapping fall back to a typed placeholder rather than
/// failing the whole row.
fn render_cell(row: &Row, idx: usize) -> String {
    let col_type = row.columns()[idx].type_().clone();

    fn opt<T: ToString>(value: Result<Option<T>, tokio_postgres::Error>) -> Option<String> {
        value
            .ok()
            .map(|v| v.map(|x| x.to_string()).unwrap_or_default())
    }

    let rendered = if col_type == Type::BOOL {
        opt(row.try_get::<_, Option<bool>>(idx))
    } else if col_type == Type::INT2 {
        opt(row.try_get::<_, Option<i16>>(idx))
    } else if col_type == Type::INT4 {
        opt(row.try_get::<_, Option<i32>>(idx))
    } else if col_type == Type::INT8 {
        opt(row.try_get::<_, Option<i64>>(idx))
    } else if col_type == Type::FLOAT4 {
        opt(row.try_get::<_, Option<f32>>(idx))
    } else if col_type == Type::FLOAT8 {
        opt(row.try_get::<_, Option<f64>>(idx))
    } else if col_type == Type::NUMERIC {
        opt(row.try_get::<_, Option<Decimal>>(idx))
    } else if col_type == Type::TEXT
        || col_type == Type::VARCHAR
        || col_type == Type::BPCHAR
        || col_type == Type::NAME
    {
        opt(row.try_get::<_, Option<String>>(idx))
    } else if col_type == Type::DATE {
        opt(row.try_get::<_, Option<NaiveDate>>(idx))
    } else if col_type == Type::TIME {
        opt(row.try_get::<_, Option<NaiveTime>>(idx))
    } else if col_type == Type::TIMESTAMP {
        opt(row.try_get::<_, Option<NaiveDateTime>>(idx))
    } else if col_type == Type::TIMESTAMPTZ {
        opt(row.try_get::<_, Option<DateTime<Utc>>>(idx))
    } else if col_type == Type::JSON || col_type == Type::JSONB {
        opt(row.try_get::<_, Option<serde_json::Value>>(idx))
    } else {
        opt(row.try_get::<_, Option<String>>(idx))
    };

    rendered.unwrap_or_else(|| format!("<{}>", col_type.name()))
}

// =============================================================================
// TESTS
// =============================================================================
