//! Query embedding.
//!
//! This module provides:
//! - `EmbeddingBackend` / `EmbeddingModel`: the load seam, so tests can
//!   inject deterministic vectors
//! - `MiniLmBackend`: the production backend (local MiniLM via fastembed)
//! - `Embedder`: shared, lazily-initialized wrapper with a single in-flight
//!   load

mod backend;
mod embedder;

pub use backend::{EmbeddingBackend, EmbeddingModel, MiniLmBackend};
pub use embedder::Embedder;
