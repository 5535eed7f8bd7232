use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::core::errors::RetrievalError;
use crate::embedding::backend::{EmbeddingBackend, EmbeddingModel};

/// Lifecycle of the shared feature-extraction model.
enum ModelState {
    Uninitialized,
    /// A load is in flight; the receiver resolves once it settles.
    Loading(watch::Receiver<()>),
    Ready(Arc<dyn EmbeddingModel>),
    Failed(String),
}

/// Shared, lazily-initialized embedder.
///
/// The first `initialize` call spawns the backend load as a detached task,
/// so a cancelled caller cannot strand the state mid-load; every concurrent
/// caller awaits the same in-flight load. A failed load is terminal for the
/// process: later calls report `ModelLoad` without retrying the download.
#[derive(Clone)]
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
    state: Arc<RwLock<ModelState>>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(ModelState::Uninitialized)),
        }
    }

    /// Waits until the model is ready, triggering the load on first use.
    pub async fn initialize(&self) -> Result<(), RetrievalError> {
        loop {
            let mut pending = {
                let mut state = self.state.write().await;
                match &*state {
                    ModelState::Ready(_) => return Ok(()),
                    ModelState::Failed(reason) => {
                        return Err(RetrievalError::ModelLoad(reason.clone()))
                    }
                    ModelState::Loading(rx) => rx.clone(),
                    ModelState::Uninitialized => {
                        let (tx, rx) = watch::channel(());
                        *state = ModelState::Loading(rx.clone());
                        drop(state);
                        self.spawn_load(tx);
                        rx
                    }
                }
            };

            if pending.changed().await.is_err() {
                // The load task dropped its sender without settling the
                // state (panicked); record the failure instead of spinning.
                let mut state = self.state.write().await;
                if matches!(&*state, ModelState::Loading(_)) {
                    *state = ModelState::Failed("model load task aborted".to_string());
                }
            }
        }
    }

    /// Embeds `text` with the loaded model. Inference runs on the blocking
    /// pool; fails with `NotInitialized` until `initialize` has completed.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let model = {
            let state = self.state.read().await;
            match &*state {
                ModelState::Ready(model) => Arc::clone(model),
                ModelState::Failed(reason) => {
                    return Err(RetrievalError::ModelLoad(reason.clone()))
                }
                ModelState::Uninitialized | ModelState::Loading(_) => {
                    return Err(RetrievalError::NotInitialized)
                }
            }
        };

        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.embed(&text))
            .await
            .map_err(RetrievalError::internal)?
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.read().await, ModelState::Ready(_))
    }

    fn spawn_load(&self, tx: watch::Sender<()>) {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let name = backend.describe();
        tokio::spawn(async move {
            tracing::info!("Loading embedding model {name}");
            let outcome = backend.load().await;
            {
                let mut slot = state.write().await;
                match outcome {
                    Ok(model) => {
                        tracing::info!("Embedding model {name} ready");
                        *slot = ModelState::Ready(model);
                    }
                    Err(err) => {
                        let reason = match err {
                            RetrievalError::ModelLoad(msg) => msg,
                            other => other.to_string(),
                        };
                        tracing::warn!("Embedding model {name} failed to load: {reason}");
                        *slot = ModelState::Failed(reason);
                    }
                }
            }
            let _ = tx.send(());
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    struct StubModel {
        vector: Vec<f32>,
    }

    impl EmbeddingModel for StubModel {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(self.vector.clone())
        }
    }

    struct StubBackend {
        loads: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl StubBackend {
        fn new(fail: bool, delay: Duration) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail,
                delay,
            }
        }
    }

    #[async_trait]
    impl EmbeddingBackend for StubBackend {
        async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, RetrievalError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(RetrievalError::ModelLoad("stub refused to load".to_string()));
            }
            Ok(Arc::new(StubModel {
                vector: vec![1.0, 0.0, 0.0],
            }))
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    #[tokio::test]
    async fn embed_before_initialize_is_an_error() {
        let backend = Arc::new(StubBackend::new(false, Duration::ZERO));
        let embedder = Embedder::new(backend);

        let err = embedder.embed("anything").await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotInitialized));
    }

    #[tokio::test]
    async fn initialize_then_embed_works() {
        let backend = Arc::new(StubBackend::new(false, Duration::ZERO));
        let embedder = Embedder::new(backend);

        embedder.initialize().await.unwrap();
        assert!(embedder.is_ready().await);

        let vector = embedder.embed("bed hold policy").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn concurrent_initialize_loads_once() {
        let backend = Arc::new(StubBackend::new(false, Duration::from_millis(50)));
        let embedder = Embedder::new(Arc::clone(&backend) as Arc<dyn EmbeddingBackend>);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let embedder = embedder.clone();
            handles.push(tokio::spawn(async move { embedder.initialize().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_memoized() {
        let backend = Arc::new(StubBackend::new(true, Duration::ZERO));
        let embedder = Embedder::new(Arc::clone(&backend) as Arc<dyn EmbeddingBackend>);

        let first = embedder.initialize().await.unwrap_err();
        assert!(matches!(first, RetrievalError::ModelLoad(_)));

        let second = embedder.initialize().await.unwrap_err();
        assert!(matches!(second, RetrievalError::ModelLoad(_)));
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);

        let embed_err = embedder.embed("question").await.unwrap_err();
        assert!(matches!(embed_err, RetrievalError::ModelLoad(_)));
    }
}
