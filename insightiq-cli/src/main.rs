//! InsightIQ CLI
//!
//! Thin wiring around the engine: build the clients once, dispatch one
//! subcommand, print the outcome. No logic lives here.

use clap::{Parser, Subcommand};
use insightiq_core::{AskOutcome, ConfigError, EngineConfig, InsightError, InsightResult, QueryResult};
use insightiq_engine::QueryEngine;
use insightiq_index::{TableIndex, VectorTableIndex};
use insightiq_llm::providers::{GeminiCompletionProvider, GeminiEmbeddingProvider};
use insightiq_store::{PgSchemaStore, SchemaStore, StoreConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insightiq", about = "Ask your database questions in plain language")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// (Re-)index the database schema into the semantic table index
    Index,
    /// Ask a natural-language question and print the result
    Ask {
        /// The question, e.g. "Top 3 customers by total spend"
        question: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn api_key() -> InsightResult<String> {
    std::env::var("GEMINI_API_KEY").map_err(|_| {
        InsightError::Config(ConfigError::MissingRequired {
            field: "GEMINI_API_KEY".to_string(),
        })
    })
}

fn index_path() -> String {
    std::env::var("INSIGHTIQ_INDEX_PATH").unwrap_or_else(|_| "schema_index.json".to_string())
}

async fn run(cli: Cli) -> InsightResult<()> {
    let pool = StoreConfig::from_env().create_pool()?;
    let store = Arc::new(PgSchemaStore::new(pool));

    let key = api_key()?;
    let embedder = Arc::new(GeminiEmbeddingProvider::with_default_model(key.clone()));
    let index = Arc::new(VectorTableIndex::open(index_path(), embedder)?);

    match cli.command {
        Cmd::Index => {
            let schema = store.get_schema().await?;
            let indexed = index.index_schema(&schema).await?;
            println!("Indexed {} tables.", indexed);
        }
        Cmd::Ask { question } => {
            let model = Arc::new(GeminiCompletionProvider::with_default_model(key));
            let engine = QueryEngine::new(store, index, model, EngineConfig::from_env())?;

            match engine.ask(&question).await? {
                AskOutcome::Answer(result) => print_table(&result),
                outcome => {
                    // NotUnderstood / RetriesExhausted carry fixed messages.
                    if let Some(message) = outcome.message() {
                        println!("{}", message);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_table(result: &QueryResult) {
    println!("{}", result.columns.join(" | "));
    println!("{}", "-".repeat(result.columns.join(" | ").len().max(4)));
    for row in &result.rows {
        println!("{}", row.join(" | "));
    }
    println!("({} rows)", result.len());
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
