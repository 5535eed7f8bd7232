//! Per-jurisdiction vector index.
//!
//! Partitions load lazily from `<embeddings_dir>/<jurisdiction>.json` on
//! first query; a missing file marks the jurisdiction absent and is never
//! retried. Search embeds the question (triggering the shared model load on
//! first use) and runs a synchronous cosine scan over the partition.

mod chunk;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

pub use chunk::{ChunkMetadata, PartitionStats, SearchResult};

use chunk::EmbeddingChunk;

use crate::core::errors::RetrievalError;
use crate::embedding::Embedder;
use crate::vector_math::rank_descending_by_cosine;

enum PartitionSlot {
    Loaded(Arc<Partition>),
    /// No embeddings dump exists for this jurisdiction; cached so the
    /// filesystem probe happens once per process.
    Absent,
}

struct Partition {
    chunks: Vec<EmbeddingChunk>,
}

/// In-memory vector index over per-jurisdiction embedding dumps.
pub struct VectorIndex {
    embedder: Embedder,
    embeddings_dir: PathBuf,
    partitions: Mutex<HashMap<String, PartitionSlot>>,
}

impl VectorIndex {
    pub fn new(embedder: Embedder, embeddings_dir: PathBuf) -> Self {
        Self {
            embedder,
            embeddings_dir,
            partitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Loads the partition for `jurisdiction` if it has not been attempted
    /// yet. A missing dump is a valid state, not an error; a malformed dump
    /// fails loudly.
    pub async fn load_partition(&self, jurisdiction: &str) -> Result<(), RetrievalError> {
        self.ensure_partition(jurisdiction).await.map(|_| ())
    }

    /// Drops the cached slot for `jurisdiction` so the next query re-reads
    /// the dump. Intended for operational refresh after re-embedding.
    pub async fn invalidate(&self, jurisdiction: &str) {
        let key = partition_key(jurisdiction);
        self.partitions.lock().await.remove(&key);
    }

    /// Top-K semantic search within one jurisdiction.
    ///
    /// Returns an empty list (not an error) when the jurisdiction has no
    /// embeddings or the model cannot be loaded; that emptiness is the
    /// orchestrator's signal to fall back to live documents. The one loud
    /// failure is a corrupted dump (dimension mismatch or unparseable file).
    pub async fn search(
        &self,
        jurisdiction: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        if let Err(err) = self.embedder.initialize().await {
            tracing::warn!("Semantic search unavailable for {jurisdiction}: {err}");
            return Ok(Vec::new());
        }

        let Some(partition) = self.ensure_partition(jurisdiction).await? else {
            return Ok(Vec::new());
        };
        if partition.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("Query embedding failed for {jurisdiction}: {err}");
                return Ok(Vec::new());
            }
        };

        let mut ranked = rank_descending_by_cosine(
            &query_vector,
            partition.chunks.iter().map(|c| c.embedding.as_slice()),
        )
        .map_err(|err| {
            tracing::error!("Corrupt embeddings for {jurisdiction}: {err}");
            err
        })?;
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(idx, similarity)| {
                let chunk = &partition.chunks[idx];
                SearchResult {
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    similarity,
                }
            })
            .collect())
    }

    /// Bulk-preload: warms the model and loads every `*.json` dump under
    /// the embeddings directory. Returns the number of loaded partitions.
    pub async fn preload_all(&self) -> Result<usize, RetrievalError> {
        if let Err(err) = self.embedder.initialize().await {
            tracing::warn!("Embedding model unavailable during preload: {err}");
        }

        let mut dir = match tokio::fs::read_dir(&self.embeddings_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "No embeddings directory at {}; run the processing scripts first",
                    self.embeddings_dir.display()
                );
                return Ok(0);
            }
            Err(err) => return Err(RetrievalError::internal(err)),
        };

        let mut loaded = 0;
        while let Some(entry) = dir.next_entry().await.map_err(RetrievalError::internal)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if self.ensure_partition(stem).await?.is_some() {
                loaded += 1;
            }
        }

        tracing::info!("Vector index preloaded {loaded} jurisdictions");
        Ok(loaded)
    }

    /// Jurisdictions with a loaded (non-absent) partition, sorted.
    pub async fn available_jurisdictions(&self) -> Vec<String> {
        let partitions = self.partitions.lock().await;
        let mut keys: Vec<String> = partitions
            .iter()
            .filter(|(_, slot)| matches!(slot, PartitionSlot::Loaded(_)))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Chunk count plus doc-type and source breakdown for a loaded
    /// partition. `None` for unloaded or absent jurisdictions; never
    /// triggers a load.
    pub async fn stats(&self, jurisdiction: &str) -> Option<PartitionStats> {
        let key = partition_key(jurisdiction);
        let partitions = self.partitions.lock().await;
        let Some(PartitionSlot::Loaded(partition)) = partitions.get(&key) else {
            return None;
        };

        let mut document_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut sources: BTreeSet<String> = BTreeSet::new();
        for chunk in &partition.chunks {
            *document_types
                .entry(chunk.metadata.doc_type.clone())
                .or_insert(0) += 1;
            sources.insert(chunk.metadata.source.clone());
        }

        Some(PartitionStats {
            jurisdiction: key,
            total_chunks: partition.chunks.len(),
            document_types,
            sources: sources.into_iter().collect(),
        })
    }

    async fn ensure_partition(
        &self,
        jurisdiction: &str,
    ) -> Result<Option<Arc<Partition>>, RetrievalError> {
        let key = partition_key(jurisdiction);
        // The lock is held across the file read: loads are serialized and
        // each jurisdiction is probed exactly once per process.
        let mut partitions = self.partitions.lock().await;
        if let Some(slot) = partitions.get(&key) {
            return Ok(match slot {
                PartitionSlot::Loaded(partition) => Some(Arc::clone(partition)),
                PartitionSlot::Absent => None,
            });
        }

        let path = self.embeddings_dir.join(format!("{key}.json"));
        let slot = match load_partition_file(&path).await? {
            Some(partition) => {
                tracing::info!(
                    "Loaded {} embeddings for {jurisdiction}",
                    partition.chunks.len()
                );
                PartitionSlot::Loaded(Arc::new(partition))
            }
            None => {
                tracing::warn!(
                    "No embeddings found for {jurisdiction} at {}",
                    path.display()
                );
                PartitionSlot::Absent
            }
        };

        let result = match &slot {
            PartitionSlot::Loaded(partition) => Some(Arc::clone(partition)),
            PartitionSlot::Absent => None,
        };
        partitions.insert(key, slot);
        Ok(result)
    }
}

/// Builds the prompt block the chat layer splices into its context window:
/// one numbered section per result with source, type and relevance.
pub fn format_context(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for (idx, result) in results.iter().enumerate() {
        if idx > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "[Document {}]\nSource: {}\nType: {}\nRelevance: {:.1}%\n\n{}\n\n---",
            idx + 1,
            result.metadata.source,
            result.metadata.doc_type,
            result.similarity * 100.0,
            result.text
        );
    }
    out
}

fn partition_key(jurisdiction: &str) -> String {
    jurisdiction.trim().to_lowercase()
}

async fn load_partition_file(path: &Path) -> Result<Option<Partition>, RetrievalError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(RetrievalError::InvalidPartition {
                path: path.display().to_string(),
                reason: err.to_string(),
            })
        }
    };

    let chunks: Vec<EmbeddingChunk> =
        serde_json::from_slice(&bytes).map_err(|err| RetrievalError::InvalidPartition {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

    Ok(Some(Partition { chunks }))
}
