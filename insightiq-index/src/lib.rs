//! InsightIQ Index - Semantic Table Index
//!
//! Maintains one document per table ("Table X contains columns: ...") in a
//! persistent local index and answers "which tables are relevant to this
//! question?" by cosine similarity over embeddings. The index is eventually
//! consistent with the live schema: re-indexing must be triggered explicitly
//! after schema changes.

use async_trait::async_trait;
use insightiq_core::{EmbeddingVector, IndexError, InsightResult, SchemaMap};
use insightiq_llm::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

// ============================================================================
// TABLE INDEX TRAIT
// ============================================================================

/// The semantic-index boundary.
#[async_trait]
pub trait TableIndex: Send + Sync {
    /// Upsert one document per table, keyed by table name. Idempotent for an
    /// unchanged schema. Returns the number of tables indexed.
    async fn index_schema(&self, schema: &SchemaMap) -> InsightResult<usize>;

    /// Up to `n` table names ranked most-relevant-first.
    ///
    /// Degrades to an empty list when the index is empty or the embedding
    /// call fails - "no guidance", never an error. Callers must not read an
    /// empty list as "no tables exist".
    async fn relevant_tables(&self, question: &str, n: usize) -> Vec<String>;
}

/// Synthesize the searchable description for one table.
pub fn describe_table(table: &str, columns: &[String]) -> String {
    format!("Table {} contains columns: {}", table, columns.join(", "))
}

// ============================================================================
// PERSISTENT VECTOR INDEX
// ============================================================================

/// One indexed table: the document text, its embedding, and the table name
/// as retrievable metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexEntry {
    table_name: String,
    document: String,
    embedding: EmbeddingVector,
}

/// On-disk representation of the whole index.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<IndexEntry>,
}

/// Flat cosine-scan index persisted as a JSON file.
///
/// The table count is the schema's table count, so a linear scan is the
/// right data structure; there is no ANN structure to maintain.
pub struct VectorTableIndex {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<BTreeMap<String, IndexEntry>>,
}

impl VectorTableIndex {
    /// Open the index at `path`, loading any existing entries.
    ///
    /// A missing file is an empty index; an unreadable or unparseable file
    /// is an error.
    pub fn open(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> InsightResult<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;

        Ok(Self {
            path,
            embedder,
            entries: RwLock::new(entries),
        })
    }

    /// Number of indexed tables.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &BTreeMap<String, IndexEntry>) -> InsightResult<()> {
        let file = IndexFile {
            entries: entries.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| IndexError::Io {
            path: self.path.display().to_string(),
            reason: format!("serialization failed: {}", e),
        })?;

        std::fs::write(&self.path, json).map_err(|e| {
            IndexError::Io {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn load_entries(path: &Path) -> InsightResult<BTreeMap<String, IndexEntry>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let raw = std::fs::read_to_string(path).map_err(|e| IndexError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let file: IndexFile = serde_json::from_str(&raw).map_err(|e| IndexError::Corrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(file
        .entries
        .into_iter()
        .map(|entry| (entry.table_name.clone(), entry))
        .collect())
}

#[async_trait]
impl TableIndex for VectorTableIndex {
    async fn index_schema(&self, schema: &SchemaMap) -> InsightResult<usize> {
        let model_id = self.embedder.model_id().to_string();

        // Decide what needs (re-)embedding before taking the write lock.
        let mut fresh: Vec<(String, String)> = Vec::new();
        {
            let entries = self.entries.read().expect("index lock poisoned");
            for (table, columns) in schema {
                let document = describe_table(table, columns);
                let unchanged = entries.get(table).is_some_and(|e| {
                    e.document == document && e.embedding.model_id == model_id
                });
                if !unchanged {
                    fresh.push((table.clone(), document));
                }
            }
        }

        if !fresh.is_empty() {
            let texts: Vec<&str> = fresh.iter().map(|(_, doc)| doc.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            let mut entries = self.entries.write().expect("index lock poisoned");
            for ((table, document), embedding) in fresh.into_iter().zip(embeddings) {
                entries.insert(
                    table.clone(),
                    IndexEntry {
                        table_name: table,
                        document,
                        embedding,
                    },
                );
            }
            self.persist(&*entries)?;
        }

        debug!(tables = schema.len(), "indexed schema");
        Ok(schema.len())
    }

    async fn relevant_tables(&self, question: &str, n: usize) -> Vec<String> {
        let query = match self.embedder.embed(question).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(error = %err, "question embedding failed, returning no guidance");
                return Vec::new();
            }
        };

        let entries = self.entries.read().expect("index lock poisoned");
        let mut scored: Vec<(f32, &str)> = entries
            .values()
            .filter_map(|entry| {
                // Entries from a different model are unread until re-indexed.
                query
                    .cosine_similarity(&entry.embedding)
                    .ok()
                    .map(|score| (score, entry.table_name.as_str()))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(n)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

impl std::fmt::Debug for VectorTableIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorTableIndex")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
