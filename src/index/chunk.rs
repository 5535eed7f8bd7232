use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Provenance carried by every chunk and surfaced with search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document identifier (title or filename of the regulatory source).
    pub source: String,
    /// Document category, e.g. "statute", "rule", "guidance".
    pub doc_type: String,
    /// Pass-through for any extra fields present in the embeddings dump.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One pre-embedded slice of a regulatory document, as stored in the
/// per-jurisdiction embeddings dump. Stays private to the index module so
/// the raw vector never crosses its boundary.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EmbeddingChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// A chunk matched against the current query, vector stripped.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity in [-1, 1].
    pub similarity: f32,
}

/// Observability summary for one loaded partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    pub jurisdiction: String,
    pub total_chunks: usize,
    /// Chunk count per `doc_type`.
    pub document_types: BTreeMap<String, usize>,
    /// Distinct sources, sorted.
    pub sources: Vec<String>,
}
