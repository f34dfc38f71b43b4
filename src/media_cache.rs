//! Media Cache
//!
//! Public facade composing the store, the load coordinator and the prefetch
//! window. This is what a viewer talks to.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::{CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::error::LoadError;
use crate::loader::{AssetSource, Decoder, LoadCoordinator};
use crate::prefetch::{PrefetchWindow, ReconcileOutcome, Window};

// == Media Cache ==
/// A bounded, prefetching cache of decoded assets.
///
/// Cloning is cheap; clones share all state.
pub struct MediaCache<K, A> {
    store: Arc<RwLock<CacheStore<K, A>>>,
    coordinator: LoadCoordinator<K, A>,
    prefetch: Arc<PrefetchWindow<K, A>>,
    runtime: Handle,
    default_radius: usize,
}

impl<K, A> Clone for MediaCache<K, A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: self.coordinator.clone(),
            prefetch: Arc::clone(&self.prefetch),
            runtime: self.runtime.clone(),
            default_radius: self.default_radius,
        }
    }
}

impl<K, A> MediaCache<K, A>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose loads run on `runtime`.
    ///
    /// # Arguments
    /// * `runtime` - Runtime that owns every background load
    /// * `source` - Produces raw bytes for an identifier
    /// * `decoder` - Turns raw bytes into an asset
    /// * `config` - Capacity, prefetch radius and decode concurrency
    pub fn new(
        runtime: Handle,
        source: impl AssetSource<K>,
        decoder: impl Decoder<A>,
        config: &CacheConfig,
    ) -> Self {
        let store = Arc::new(RwLock::new(CacheStore::new(config.max_entries)));
        let coordinator = LoadCoordinator::new(
            runtime.clone(),
            Arc::clone(&store),
            Arc::new(source),
            Arc::new(decoder),
            config.decode_workers,
        );
        let prefetch = Arc::new(PrefetchWindow::new(coordinator.clone()));

        Self {
            store,
            coordinator,
            prefetch,
            runtime,
            default_radius: config.prefetch_radius,
        }
    }

    // == Get ==
    /// Returns the decoded asset for `id`, waiting for its decode if needed.
    ///
    /// While the call is pending the entry is pinned and cannot be evicted.
    /// A failure is not cached: calling again retries the load.
    pub async fn get(&self, id: &K) -> Result<Arc<A>, LoadError> {
        let _pin = PinGuard::new(Arc::clone(&self.store), id.clone(), self.runtime.clone()).await;
        self.coordinator.load(id).await
    }

    // == Focus ==
    /// Declares the viewer's position and prefetches around it.
    pub async fn set_focus(&self, id: K, ordered: Vec<K>, radius: usize) -> ReconcileOutcome<K> {
        self.prefetch.reconcile(Window::new(id, ordered, radius)).await
    }

    /// `set_focus` with the configured radius.
    pub async fn set_focus_default(&self, id: K, ordered: Vec<K>) -> ReconcileOutcome<K> {
        self.set_focus(id, ordered, self.default_radius).await
    }

    // == Reset ==
    /// Full reset for a new session: cancels every job, then empties the store.
    ///
    /// Returns the number of resident entries removed.
    pub async fn clear_all(&self) -> usize {
        let cancelled = self.coordinator.cancel_all().await;
        self.prefetch.reset().await;
        let cleared = self.store.write().await.clear();
        info!("Cleared cache: {} entries removed, {} loads cancelled", cleared, cancelled);
        cleared
    }

    /// Empties the store without touching in-flight loads.
    pub async fn clear(&self) -> usize {
        self.store.write().await.clear()
    }

    pub async fn remove(&self, id: &K) -> bool {
        self.store.write().await.remove(id)
    }

    pub async fn cancel(&self, id: &K) -> bool {
        self.coordinator.cancel(id).await
    }

    pub async fn cancel_all(&self) -> usize {
        self.coordinator.cancel_all().await
    }

    /// Cancels all loads and refuses new ones. Resident entries stay readable
    /// through `peek` but `get` fails with `LoadError::ShutDown`.
    pub async fn shutdown(&self) {
        let cancelled = self.coordinator.shutdown().await;
        info!("Media cache shut down, {} loads cancelled", cancelled);
    }

    /// Waits until every registered load has settled.
    pub async fn wait_idle(&self) {
        self.coordinator.wait_idle().await
    }

    // == Queries ==
    /// Returns a resident asset without loading or counting a lookup.
    pub async fn peek(&self, id: &K) -> Option<Arc<A>> {
        self.store.read().await.peek(id)
    }

    pub async fn is_resident(&self, id: &K) -> bool {
        self.store.read().await.contains(id)
    }

    pub async fn is_loading(&self, id: &K) -> bool {
        self.coordinator.is_loading(id).await
    }

    pub async fn loading_ids(&self) -> Vec<K> {
        self.coordinator.loading_ids().await
    }

    /// Resident identifiers, oldest first.
    pub async fn resident_ids(&self) -> Vec<K> {
        self.store.read().await.keys()
    }

    pub async fn focus(&self) -> Option<K> {
        self.prefetch.current().await.map(|w| w.focus().clone())
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.store.read().await.stats();
        self.coordinator.fill_stats(&mut stats);
        stats
    }

    pub fn default_radius(&self) -> usize {
        self.default_radius
    }
}

// == Pin Guard ==
/// Keeps an identifier pinned in the store for the lifetime of a `get`,
/// including when the caller drops the future early.
struct PinGuard<K: Clone + Eq + Hash + Debug + Send + Sync + 'static, A: Send + Sync + 'static> {
    store: Arc<RwLock<CacheStore<K, A>>>,
    id: Option<K>,
    runtime: Handle,
}

impl<K, A> PinGuard<K, A>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    async fn new(store: Arc<RwLock<CacheStore<K, A>>>, id: K, runtime: Handle) -> Self {
        store.write().await.pin(&id);
        Self {
            store,
            id: Some(id),
            runtime,
        }
    }
}

impl<K, A> Drop for PinGuard<K, A>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match self.store.try_write() {
            Ok(mut store) => store.unpin(&id),
            Err(_) => {
                // Store is busy; unpin as soon as it frees up
                let store = Arc::clone(&self.store);
                self.runtime.spawn(async move {
                    store.write().await.unpin(&id);
                });
            }
        }
    }
}
