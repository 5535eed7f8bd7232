//! Retrieval subsystem for a policy-question chatbot.
//!
//! For each (jurisdiction, question) pair the service either retrieves the
//! most semantically relevant pre-embedded regulatory chunks, or, when no
//! embeddings exist for the jurisdiction, falls back to live-fetching and
//! cleaning the jurisdiction's source documents, cached with a time-based
//! expiry. The chat layer consumes the resulting evidence with provenance
//! metadata; it never sees the internals.

pub mod core;
pub mod documents;
pub mod embedding;
pub mod index;
pub mod policy;
pub mod retrieval;
pub mod vector_math;

pub use crate::core::config::RetrievalConfig;
pub use crate::core::errors::RetrievalError;
pub use documents::{CacheStats, CachedDocument, DocumentCache, DocumentKind};
pub use embedding::{Embedder, EmbeddingBackend, EmbeddingModel, MiniLmBackend};
pub use index::{format_context, ChunkMetadata, PartitionStats, SearchResult, VectorIndex};
pub use policy::{JurisdictionPolicies, PolicyRecord, PolicyRecords};
pub use retrieval::{Citation, Evidence, RetrievalService};
