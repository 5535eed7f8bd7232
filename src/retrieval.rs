//! Retrieval orchestration.
//!
//! Two-tier evidence gathering per (jurisdiction, question) turn: the RAG
//! path wins whenever the vector index yields anything; otherwise the
//! fallback fetches the jurisdiction's policy sources; and when neither
//! produces usable text the turn proceeds without deep-analysis context.

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::RetrievalConfig;
use crate::core::errors::RetrievalError;
use crate::documents::{CacheStats, CachedDocument, DocumentCache};
use crate::embedding::{Embedder, MiniLmBackend};
use crate::index::{format_context, SearchResult, VectorIndex};
use crate::policy::PolicyRecords;

/// Where a turn's grounding came from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// Ranked chunks from the vector index plus the prompt-ready context.
    Semantic {
        results: Vec<SearchResult>,
        context: String,
    },
    /// Live-fetched documents from the jurisdiction's policy sources.
    Documents { documents: Vec<CachedDocument> },
    /// Neither path produced usable grounding; answer from summaries only.
    None,
}

impl Evidence {
    pub fn is_none(&self) -> bool {
        matches!(self, Evidence::None)
    }

    /// Provenance entries for the answer, one per result or document.
    pub fn citations(&self) -> Vec<Citation> {
        match self {
            Evidence::Semantic { results, .. } => results
                .iter()
                .map(|result| Citation {
                    source: result.metadata.source.clone(),
                    doc_type: Some(result.metadata.doc_type.clone()),
                    similarity: Some(result.similarity),
                })
                .collect(),
            Evidence::Documents { documents } => documents
                .iter()
                .map(|doc| Citation {
                    source: doc.url.clone(),
                    doc_type: None,
                    similarity: None,
                })
                .collect(),
            Evidence::None => Vec::new(),
        }
    }
}

/// Provenance attached to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Front door of the retrieval subsystem.
///
/// Constructed once at process start and passed by reference; tests build
/// isolated instances with stub components via [`RetrievalService::new`].
pub struct RetrievalService {
    index: Arc<VectorIndex>,
    documents: Arc<DocumentCache>,
    top_k: usize,
    min_document_chars: usize,
}

impl RetrievalService {
    pub fn new(
        index: Arc<VectorIndex>,
        documents: Arc<DocumentCache>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            documents,
            top_k: config.top_k,
            min_document_chars: config.min_document_chars,
        }
    }

    /// Production wiring: local MiniLM embedder plus a document cache
    /// configured from `config`.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let embedder = Embedder::new(Arc::new(MiniLmBackend::new()));
        let index = Arc::new(VectorIndex::new(embedder, config.embeddings_dir.clone()));
        let documents = Arc::new(DocumentCache::new(config)?);
        Ok(Self::new(index, documents, config))
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn documents(&self) -> &Arc<DocumentCache> {
        &self.documents
    }

    /// Read-only query interface consumed by the chat orchestration.
    pub async fn search(
        &self,
        jurisdiction: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        self.index.search(jurisdiction, question, top_k).await
    }

    /// Fallback path as a standalone read-only interface.
    pub async fn get_relevant_documents(
        &self,
        jurisdiction: &str,
        category: &str,
        records: &PolicyRecords,
    ) -> Vec<CachedDocument> {
        self.documents
            .get_relevant_documents(jurisdiction, category, records)
            .await
    }

    /// Gathers grounding for one (jurisdiction, question) turn.
    ///
    /// Transient failures on either path degrade to the next stage; only
    /// data-integrity errors (`DimensionMismatch`, `InvalidPartition`)
    /// escape as `Err`, after an error-level log.
    pub async fn gather(
        &self,
        jurisdiction: &str,
        question: &str,
        category: &str,
        records: &PolicyRecords,
    ) -> Result<Evidence, RetrievalError> {
        match self.index.search(jurisdiction, question, self.top_k).await {
            Ok(results) if !results.is_empty() => {
                tracing::info!(
                    "Semantic search produced {} chunks for {jurisdiction}",
                    results.len()
                );
                let context = format_context(&results);
                return Ok(Evidence::Semantic { results, context });
            }
            Ok(_) => {
                tracing::info!("No semantic evidence for {jurisdiction}; trying live documents");
            }
            Err(err) if err.is_data_integrity() => {
                tracing::error!("Aborting retrieval for {jurisdiction}: {err}");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!("Semantic search failed for {jurisdiction}: {err}");
            }
        }

        let documents = self
            .documents
            .get_relevant_documents(jurisdiction, category, records)
            .await;
        let usable: Vec<CachedDocument> = documents
            .into_iter()
            .filter(|doc| !doc.kind.is_error() && doc.size >= self.min_document_chars)
            .collect();

        if usable.is_empty() {
            tracing::info!(
                "No usable grounding for {jurisdiction}; continuing without deep-analysis context"
            );
            return Ok(Evidence::None);
        }

        tracing::info!("Using {} live documents for {jurisdiction}", usable.len());
        Ok(Evidence::Documents { documents: usable })
    }

    /// Cache administration, consumed by operational tooling.
    pub async fn clear_cache(&self) {
        self.documents.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.documents.stats().await
    }
}
