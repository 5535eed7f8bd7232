use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::errors::RetrievalError;

/// A loaded feature-extraction model.
pub trait EmbeddingModel: Send + Sync {
    /// Embeds one text into a fixed-length vector. Deterministic for
    /// identical input and model revision.
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Owns the expensive model load; called at most once per process.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, RetrievalError>;

    /// Human-readable model identifier for logs.
    fn describe(&self) -> String;
}

/// Local MiniLM sentence embeddings (384 dims). The model mean-pools and
/// L2-normalizes its output, so dot product equals cosine similarity for
/// unit vectors; the index still divides by the norms to tolerate
/// unnormalized precomputed chunks.
pub struct MiniLmBackend {
    cache_dir: Option<PathBuf>,
}

impl MiniLmBackend {
    pub fn new() -> Self {
        Self { cache_dir: None }
    }

    /// Overrides where the model files are cached.
    pub fn with_cache_dir(dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(dir),
        }
    }
}

impl Default for MiniLmBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MiniLmBackend {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, RetrievalError> {
        let cache_dir = self.cache_dir.clone();
        let model = tokio::task::spawn_blocking(move || {
            let mut options =
                fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                    .with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(RetrievalError::internal)?
        .map_err(|err| RetrievalError::ModelLoad(err.to_string()))?;

        Ok(Arc::new(MiniLmModel {
            inner: Mutex::new(model),
        }))
    }

    fn describe(&self) -> String {
        "all-MiniLM-L6-v2".to_string()
    }
}

struct MiniLmModel {
    // Inference sessions are not shareable across threads without
    // synchronization; callers already run on the blocking pool.
    inner: Mutex<fastembed::TextEmbedding>,
}

impl EmbeddingModel for MiniLmModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut model = self
            .inner
            .lock()
            .map_err(|_| RetrievalError::Internal("embedding model mutex poisoned".to_string()))?;
        let mut vectors = model
            .embed(vec![text], None)
            .map_err(|err| RetrievalError::ModelLoad(err.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| RetrievalError::Internal("model returned no embedding".to_string()))
    }
}
