//! Shared, lazily loaded engine handle with single-flight loading.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use super::errors::LoadError;
use super::types::{EngineLoader, EngineState, MediaEngine};

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn MediaEngine>, LoadError>>>;

enum Slot {
    Unloaded,
    Loading { generation: u64, future: LoadFuture },
    Ready(Arc<dyn MediaEngine>),
}

struct HandleState {
    slot: Slot,
    /// Bumped on every new load and on release; stale loads never land.
    generation: u64,
}

struct Inner {
    loader: Arc<dyn EngineLoader>,
    state: Mutex<HandleState>,
}

/// Process-wide access point to one media engine.
///
/// Cloning is cheap and every clone shares the same engine. The first
/// `acquire` starts a load; concurrent callers await that same load.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Inner>,
}

impl EngineHandle {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                state: Mutex::new(HandleState {
                    slot: Slot::Unloaded,
                    generation: 0,
                }),
            }),
        }
    }

    /// Return the ready engine, loading it if needed.
    ///
    /// If a load fails every caller waiting on it gets the same error and
    /// the handle goes back to unloaded, so the next call retries.
    pub async fn acquire(&self) -> Result<Arc<dyn MediaEngine>, LoadError> {
        let (generation, future) = {
            let mut state = self.inner.state.lock();

            let pending = match &state.slot {
                Slot::Ready(engine) => return Ok(Arc::clone(engine)),
                Slot::Loading { generation, future } => Some((*generation, future.clone())),
                Slot::Unloaded => None,
            };

            match pending {
                Some(pending) => pending,
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let loader = Arc::clone(&self.inner.loader);
                    let inner = Arc::downgrade(&self.inner);
                    let future = async move {
                        let engine = loader.load().await?;
                        let current = inner
                            .upgrade()
                            .map(|inner| inner.state.lock().generation == generation)
                            .unwrap_or(false);
                        if !current {
                            discard(generation, engine).await;
                            return Err(LoadError::Released);
                        }
                        Ok(engine)
                    }
                    .boxed()
                    .shared();
                    state.slot = Slot::Loading {
                        generation,
                        future: future.clone(),
                    };
                    tracing::info!(generation, "Loading media engine");
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.inner.state.lock();
        let current = matches!(
            &state.slot,
            Slot::Loading { generation: g, .. } if *g == generation
        );
        if current {
            state.slot = match &result {
                Ok(engine) => {
                    tracing::info!(generation, backend = engine.name(), "Media engine ready");
                    Slot::Ready(Arc::clone(engine))
                }
                Err(e) => {
                    tracing::error!(generation, "Media engine failed to load: {}", e);
                    Slot::Unloaded
                }
            };
        }

        result
    }

    /// Whether an engine is loaded and ready.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.state.lock().slot, Slot::Ready(_))
    }

    pub fn state(&self) -> EngineState {
        match self.inner.state.lock().slot {
            Slot::Unloaded => EngineState::Unloaded,
            Slot::Loading { .. } => EngineState::Loading,
            Slot::Ready(_) => EngineState::Ready,
        }
    }

    /// Terminate the engine and return to unloaded.
    ///
    /// A load still in flight is abandoned: once it finishes the engine is
    /// terminated and its waiters get [`LoadError::Released`].
    pub async fn release(&self) {
        let engine = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            match std::mem::replace(&mut state.slot, Slot::Unloaded) {
                Slot::Ready(engine) => Some(engine),
                _ => None,
            }
        };

        if let Some(engine) = engine {
            if let Err(e) = engine.terminate().await {
                tracing::warn!("Failed to terminate media engine: {}", e);
            } else {
                tracing::info!("Media engine released");
            }
        }
    }
}

/// Terminate an engine whose load outlived its generation.
async fn discard(generation: u64, engine: Arc<dyn MediaEngine>) {
    tracing::info!(generation, "Engine released while loading, terminating it");
    if let Err(e) = engine.terminate().await {
        tracing::warn!(generation, "Failed to terminate abandoned engine: {}", e);
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{same_engine, MemoryLoader};
    use futures_util::future::join_all;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_acquires_share_one_load() {
        let loader = Arc::new(MemoryLoader::new().with_delay(Duration::from_millis(50)));
        let handle = EngineHandle::new(loader.clone());

        let results = join_all((0..8).map(|_| handle.acquire())).await;

        assert_eq!(loader.load_count(), 1);
        let engines: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        for engine in &engines[1..] {
            assert!(same_engine(&engines[0], engine));
        }
        assert!(handle.is_ready());
        assert_eq!(handle.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn ready_engine_is_reused() {
        let loader = Arc::new(MemoryLoader::new());
        let handle = EngineHandle::new(loader.clone());

        let first = handle.acquire().await.unwrap();
        let second = handle.clone().acquire().await.unwrap();

        assert_eq!(loader.load_count(), 1);
        assert!(same_engine(&first, &second));
    }

    #[tokio::test]
    async fn failed_load_is_shared_then_retried() {
        let loader = Arc::new(
            MemoryLoader::failing(LoadError::PayloadFetch {
                url: "https://assets.example.com/ffprobe".to_string(),
                message: "HTTP 404".to_string(),
            })
            .with_delay(Duration::from_millis(20)),
        );
        let handle = EngineHandle::new(loader.clone());

        let results = join_all((0..3).map(|_| handle.acquire())).await;
        assert_eq!(loader.load_count(), 1);
        for result in &results {
            assert!(matches!(result, Err(LoadError::PayloadFetch { .. })));
        }
        assert_eq!(handle.state(), EngineState::Unloaded);

        let _ = handle.acquire().await;
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test]
    async fn release_terminates_and_allows_reload() {
        let loader = Arc::new(MemoryLoader::new());
        let handle = EngineHandle::new(loader.clone());

        handle.acquire().await.unwrap();
        let engine = loader.last_engine().unwrap();

        handle.release().await;
        assert!(engine.is_terminated());
        assert_eq!(handle.state(), EngineState::Unloaded);

        handle.acquire().await.unwrap();
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test]
    async fn release_during_load_terminates_late_engine() {
        let loader = Arc::new(MemoryLoader::new().with_delay(Duration::from_millis(50)));
        let handle = EngineHandle::new(loader.clone());

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state(), EngineState::Loading);

        handle.release().await;
        let result = waiter.await.unwrap();

        assert!(matches!(result, Err(LoadError::Released)));
        assert!(loader.last_engine().unwrap().is_terminated());
        assert_eq!(handle.state(), EngineState::Unloaded);

        handle.acquire().await.unwrap();
        assert_eq!(loader.load_count(), 2);
        assert!(!loader.last_engine().unwrap().is_terminated());
    }
}
