//! Passage index: embedded passages with nearest-neighbour search.
//!
//! The index holds an immutable snapshot behind `RwLock<Arc<_>>`. Readers
//! clone the `Arc` and search without holding the lock; writers build a
//! complete replacement snapshot off to the side and swap it in, so a query
//! never observes a half-built index. Writers are serialized by a separate
//! mutex.
//!
//! Scores are cosine similarity (higher = more similar). Results are sorted
//! by descending score, ties by insertion order.
//!
//! Snapshots persist as a single JSON file (`save` / `load`).

use crate::vector::rank_by_similarity;
use draftwright_core::Embedder;
use draftwright_core::error::IndexError;
use draftwright_core::passage::{Passage, ScoredPassage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// A passage and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPassage {
    pub passage: Passage,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexSnapshot {
    /// Embedder that produced the vectors
    embedder: String,
    dimensions: usize,
    entries: Vec<IndexedPassage>,
}

impl IndexSnapshot {
    fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.passage.id == id)
    }
}

/// Whether the index has anything to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Ready,
    NotReady,
}

/// Outcome of a query. An unready index yields `NotReady` and no hits.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: IndexStatus,
    pub hits: Vec<ScoredPassage>,
}

impl QueryResult {
    fn not_ready() -> Self {
        Self {
            status: IndexStatus::NotReady,
            hits: Vec::new(),
        }
    }
}

/// Shared, mostly-read passage store.
pub struct PassageIndex {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl PassageIndex {
    /// An empty (unready) index.
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    async fn current(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Number of indexed passages.
    pub async fn len(&self) -> usize {
        self.current().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn status(&self) -> IndexStatus {
        if self.is_empty().await {
            IndexStatus::NotReady
        } else {
            IndexStatus::Ready
        }
    }

    /// Embed and append passages. Passages whose id is already indexed are
    /// skipped. Returns how many were added.
    pub async fn add(&self, passages: Vec<Passage>) -> Result<usize, IndexError> {
        let _guard = self.writer.lock().await;
        let current = self.current().await;

        let mut seen: HashSet<String> = HashSet::new();
        let fresh: Vec<Passage> = passages
            .into_iter()
            .filter(|p| {
                let duplicate = current.contains(&p.id) || !seen.insert(p.id.clone());
                if duplicate {
                    warn!(passage = %p.id, "Skipping passage already in the index");
                }
                !duplicate
            })
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let expected = (current.dimensions > 0).then_some(current.dimensions);
        let embedded = self.embed_passages(fresh, expected).await?;
        let added = embedded.len();

        let mut entries = current.entries.clone();
        let dimensions = embedded.first().map_or(current.dimensions, |e| e.embedding.len());
        entries.extend(embedded);
        self.swap(IndexSnapshot {
            embedder: self.embedder.name().to_string(),
            dimensions,
            entries,
        })
        .await;

        debug!(added, "Passages added to index");
        Ok(added)
    }

    /// Clear and rebuild from scratch. The old snapshot keeps serving
    /// queries until the new one is complete.
    pub async fn rebuild(&self, passages: Vec<Passage>) -> Result<usize, IndexError> {
        let _guard = self.writer.lock().await;

        let mut seen: HashSet<String> = HashSet::new();
        let unique: Vec<Passage> = passages
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();

        let embedded = self.embed_passages(unique, None).await?;
        let dimensions = embedded.first().map_or(0, |e| e.embedding.len());
        let count = embedded.len();
        self.swap(IndexSnapshot {
            embedder: self.embedder.name().to_string(),
            dimensions,
            entries: embedded,
        })
        .await;

        info!(passages = count, embedder = %self.embedder.name(), "Passage index rebuilt");
        Ok(count)
    }

    async fn swap(&self, snapshot: IndexSnapshot) {
        *self.snapshot.write().await = Arc::new(snapshot);
    }

    /// Embed in batches, checking that every vector has the same size.
    async fn embed_passages(
        &self,
        passages: Vec<Passage>,
        expected: Option<usize>,
    ) -> Result<Vec<IndexedPassage>, IndexError> {
        let mut dimensions = expected;
        let mut out = Vec::with_capacity(passages.len());

        for batch in passages.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;
            if vectors.len() != batch.len() {
                return Err(IndexError::EmbeddingFailed(format!(
                    "embedder returned {} vectors for {} passages",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (passage, embedding) in batch.iter().zip(vectors) {
                let expected = *dimensions.get_or_insert(embedding.len());
                if embedding.len() != expected {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        found: embedding.len(),
                    });
                }
                out.push(IndexedPassage {
                    passage: passage.clone(),
                    embedding,
                });
            }
        }
        Ok(out)
    }

    /// The `k` passages nearest to `text`, best first.
    ///
    /// Returns exactly `min(k, len)` hits on a ready index. On an empty
    /// index returns [`IndexStatus::NotReady`] without calling the embedder.
    pub async fn query(&self, text: &str, k: usize) -> Result<QueryResult, IndexError> {
        let snapshot = self.current().await;
        if snapshot.entries.is_empty() {
            return Ok(QueryResult::not_ready());
        }
        if k == 0 {
            return Ok(QueryResult {
                status: IndexStatus::Ready,
                hits: Vec::new(),
            });
        }

        let query = self
            .embedder
            .embed_one(text)
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;
        if query.len() != snapshot.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: snapshot.dimensions,
                found: query.len(),
            });
        }

        let ranked = rank_by_similarity(
            &query,
            snapshot.entries.iter().map(|e| e.embedding.as_slice()),
            k,
        );
        let hits = ranked
            .into_iter()
            .map(|(i, score)| ScoredPassage {
                passage: snapshot.entries[i].passage.clone(),
                score,
            })
            .collect();

        Ok(QueryResult {
            status: IndexStatus::Ready,
            hits,
        })
    }

    /// Write the current snapshot as JSON.
    pub async fn save(&self, path: &Path) -> Result<(), IndexError> {
        let snapshot = self.current().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Storage(format!("Failed to create index directory: {e}"))
            })?;
        }
        let json = serde_json::to_string(snapshot.as_ref())
            .map_err(|e| IndexError::Storage(format!("Failed to serialize index: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| IndexError::Storage(format!("Failed to write index file: {e}")))?;

        info!(path = %path.display(), passages = snapshot.entries.len(), "Index snapshot saved");
        Ok(())
    }

    /// Load a snapshot written by [`PassageIndex::save`]. A missing file
    /// yields an empty, unready index.
    pub fn load(
        path: &Path,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let index = Self::new(embedder, batch_size);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No index snapshot, starting empty");
                return Ok(index);
            }
            Err(e) => {
                return Err(IndexError::Storage(format!("Failed to read index file: {e}")));
            }
        };

        let snapshot: IndexSnapshot = serde_json::from_str(&content)
            .map_err(|e| IndexError::Storage(format!("Corrupted index file: {e}")))?;
        if snapshot.embedder != index.embedder.name() {
            warn!(
                built_with = %snapshot.embedder,
                current = %index.embedder.name(),
                "Index was built with a different embedder; reindex recommended"
            );
        }
        debug!(path = %path.display(), passages = snapshot.entries.len(), "Index snapshot loaded");

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            ..index
        })
    }
}
