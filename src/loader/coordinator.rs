//! Load Coordinator
//!
//! Deduplicates concurrent requests for the same identifier. Registration,
//! attachment and removal of jobs all happen under the registry lock; fetch
//! and decode run outside it on the blocking pool, bounded by a semaphore.
//!
//! Lock order is always registry -> store.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{Mutex, Notify, RwLock, Semaphore};
use tracing::{debug, info, warn};

use super::job::{JobState, LoadJob, LoadOrigin};
use super::source::{AssetSource, Decoder};
use crate::cache::{CacheStats, CacheStore};
use crate::error::LoadError;

type Registry<K, A> = HashMap<K, Arc<LoadJob<A>>>;

/// How a job's pipeline ended, before it is published.
enum Outcome<A> {
    Loaded { asset: A, bytes: usize },
    Failed(LoadError),
    Cancelled,
}

#[derive(Debug, Default)]
struct LoadCounters {
    started: AtomicU64,
    cancelled: AtomicU64,
    failures: AtomicU64,
    prefetch_failures: AtomicU64,
}

struct Shared<K, A> {
    store: Arc<RwLock<CacheStore<K, A>>>,
    jobs: Mutex<Registry<K, A>>,
    source: Arc<dyn AssetSource<K>>,
    decoder: Arc<dyn Decoder<A>>,
    /// Bounds the number of fetch+decode pipelines running at once
    permits: Arc<Semaphore>,
    runtime: Handle,
    next_generation: AtomicU64,
    shut_down: AtomicBool,
    /// Signalled whenever a job leaves the registry
    settled: Notify,
    counters: LoadCounters,
}

// == Load Coordinator ==
/// Owns the job registry and runs every load.
///
/// Cloning is cheap; clones share the same registry.
pub struct LoadCoordinator<K, A> {
    shared: Arc<Shared<K, A>>,
}

impl<K, A> Clone for LoadCoordinator<K, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, A> LoadCoordinator<K, A>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a coordinator that spawns its jobs on `runtime` and allows at
    /// most `decode_workers` of them to fetch or decode at the same time.
    pub fn new(
        runtime: Handle,
        store: Arc<RwLock<CacheStore<K, A>>>,
        source: Arc<dyn AssetSource<K>>,
        decoder: Arc<dyn Decoder<A>>,
        decode_workers: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                jobs: Mutex::new(HashMap::new()),
                source,
                decoder,
                permits: Arc::new(Semaphore::new(decode_workers.max(1))),
                runtime,
                next_generation: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
                settled: Notify::new(),
                counters: LoadCounters::default(),
            }),
        }
    }

    // == Load ==
    /// Returns the asset for `id`, decoding it if necessary.
    ///
    /// Attaches to an in-flight job when one exists. If that job gets
    /// cancelled underneath us the request is dispatched again, so a direct
    /// caller only ever sees an asset or a real failure.
    pub async fn load(&self, id: &K) -> Result<Arc<A>, LoadError> {
        loop {
            if self.is_shut_down() {
                return Err(LoadError::ShutDown);
            }
            if let Some(asset) = self.shared.store.read().await.try_get(id) {
                return Ok(asset);
            }

            let attached = {
                let mut jobs = self.shared.jobs.lock().await;
                // A job may have settled between the lookup above and taking the lock
                if let Some(asset) = self.shared.store.read().await.peek(id) {
                    return Ok(asset);
                }
                let job = match jobs.get(id) {
                    Some(job) => {
                        debug!("Attaching to load #{} of {:?}", job.generation, id);
                        Arc::clone(job)
                    }
                    None => self.register(&mut jobs, id, LoadOrigin::Direct),
                };
                job.attach_direct()
            };
            let job = attached.job();

            match job.wait().await {
                JobState::Loaded(asset) => return Ok(asset),
                JobState::Failed(err) => return Err(err),
                JobState::Cancelled => {
                    debug!("Load #{} of {:?} was cancelled, re-dispatching", job.generation, id);
                }
                JobState::Pending => {
                    return Err(LoadError::Internal("load job woke while pending".to_string()))
                }
            }
        }
    }

    // == Prefetch ==
    /// Starts a background load for `id` unless it is resident or loading.
    ///
    /// A cancelled job that is still winding down is flagged to restart once
    /// it settles. Returns whether a new job was registered now.
    pub async fn prefetch(&self, id: &K) -> bool {
        if self.is_shut_down() {
            return false;
        }

        let mut jobs = self.shared.jobs.lock().await;
        if let Some(job) = jobs.get(id) {
            if job.is_cancelled() {
                job.request_respawn();
            }
            return false;
        }
        if self.shared.store.read().await.contains(id) {
            return false;
        }
        self.register(&mut jobs, id, LoadOrigin::Prefetch);
        true
    }

    // == Cancel ==
    /// Signals the job for `id` to stop.
    ///
    /// The job stays registered until its task acknowledges the cancellation.
    pub async fn cancel(&self, id: &K) -> bool {
        let jobs = self.shared.jobs.lock().await;
        match jobs.get(id) {
            Some(job) => signal_cancel(id, job),
            None => false,
        }
    }

    /// Cancels every active job whose identifier matches `predicate`.
    ///
    /// Returns the identifiers that were signalled.
    pub async fn cancel_where(&self, mut predicate: impl FnMut(&K) -> bool) -> Vec<K> {
        let jobs = self.shared.jobs.lock().await;
        jobs.iter()
            .filter(|(id, _)| predicate(*id))
            .filter(|(id, job)| signal_cancel(*id, job))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn cancel_all(&self) -> usize {
        self.cancel_where(|_| true).await.len()
    }

    // == Shutdown ==
    /// Cancels everything and refuses further loads.
    ///
    /// Returns the number of jobs that were signalled.
    pub async fn shutdown(&self) -> usize {
        self.shared.shut_down.store(true, Ordering::SeqCst);
        self.shared.permits.close();
        self.cancel_all().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::SeqCst)
    }

    // == Queries ==
    /// Whether a job for `id` is registered (including one being cancelled).
    pub async fn is_loading(&self, id: &K) -> bool {
        self.shared.jobs.lock().await.contains_key(id)
    }

    pub async fn loading_ids(&self) -> Vec<K> {
        self.shared.jobs.lock().await.keys().cloned().collect()
    }

    pub async fn active_jobs(&self) -> usize {
        self.shared.jobs.lock().await.len()
    }

    /// Waits until no job is registered.
    pub async fn wait_idle(&self) {
        loop {
            let settled = self.shared.settled.notified();
            if self.shared.jobs.lock().await.is_empty() {
                return;
            }
            settled.await;
        }
    }

    /// Copies the load counters into a store statistics snapshot.
    pub fn fill_stats(&self, stats: &mut CacheStats) {
        let counters = &self.shared.counters;
        stats.loads_started = counters.started.load(Ordering::Relaxed);
        stats.loads_cancelled = counters.cancelled.load(Ordering::Relaxed);
        stats.load_failures = counters.failures.load(Ordering::Relaxed);
        stats.prefetch_failures = counters.prefetch_failures.load(Ordering::Relaxed);
    }

    // == Job Lifecycle ==
    /// Registers a new job for `id` and spawns its pipeline.
    ///
    /// Callers must hold the registry lock and have checked that no job for
    /// `id` exists.
    fn register(&self, jobs: &mut Registry<K, A>, id: &K, origin: LoadOrigin) -> Arc<LoadJob<A>> {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(LoadJob::new(generation, origin));
        jobs.insert(id.clone(), Arc::clone(&job));
        self.shared.counters.started.fetch_add(1, Ordering::Relaxed);
        debug!("Registered {:?} load #{} of {:?}", origin, generation, id);

        let coordinator = self.clone();
        let task_id = id.clone();
        let task_job = Arc::clone(&job);
        self.shared.runtime.spawn(async move {
            coordinator.run(task_id, task_job).await;
        });

        job
    }

    async fn run(self, id: K, job: Arc<LoadJob<A>>) {
        let started = Instant::now();
        let outcome = self.execute(&id, &job).await;
        self.settle(&id, &job, outcome, started.elapsed()).await;
    }

    /// Fetch then decode, checking for cancellation between every step.
    async fn execute(&self, id: &K, job: &LoadJob<A>) -> Outcome<A> {
        let _permit = tokio::select! {
            biased;
            _ = job.cancelled() => return Outcome::Cancelled,
            permit = Arc::clone(&self.shared.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Outcome::Failed(LoadError::ShutDown),
            },
        };

        let source = Arc::clone(&self.shared.source);
        let fetch_id = id.clone();
        let bytes = match self
            .shared
            .runtime
            .spawn_blocking(move || source.fetch(&fetch_id))
            .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => return Outcome::Failed(LoadError::Fetch(err)),
            Err(err) => {
                return Outcome::Failed(LoadError::Internal(format!("fetch task failed: {}", err)))
            }
        };
        if job.is_cancelled() {
            return Outcome::Cancelled;
        }

        let decoder = Arc::clone(&self.shared.decoder);
        let size = bytes.len();
        let asset = match self
            .shared
            .runtime
            .spawn_blocking(move || decoder.decode(&bytes))
            .await
        {
            Ok(Ok(asset)) => asset,
            Ok(Err(err)) => return Outcome::Failed(LoadError::Decode(err)),
            Err(err) => {
                return Outcome::Failed(LoadError::Internal(format!("decode task failed: {}", err)))
            }
        };
        // Cancellation after this point is resolved by `settle` under the registry lock
        Outcome::Loaded { asset, bytes: size }
    }

    /// Records the outcome, removes the job and wakes its waiters.
    async fn settle(&self, id: &K, job: &Arc<LoadJob<A>>, outcome: Outcome<A>, elapsed: Duration) {
        let mut jobs = self.shared.jobs.lock().await;

        // Cancellation is ordered by the registry lock, so a late cancel still wins
        let cancelled = job.is_cancelled();
        let state = match outcome {
            Outcome::Loaded { asset, .. } if cancelled => {
                self.shared.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                if job.has_direct_waiters() {
                    // Cancelled jobs never insert into the store
                    debug!(
                        "Load #{} of {:?} cancelled after decoding, handing it to direct callers only",
                        job.generation, id
                    );
                    JobState::Loaded(Arc::new(asset))
                } else {
                    debug!("Load #{} of {:?} discarded after cancellation", job.generation, id);
                    JobState::Cancelled
                }
            }
            Outcome::Loaded { asset, bytes } => {
                let asset = Arc::new(asset);
                let retained = self
                    .shared
                    .store
                    .write()
                    .await
                    .put(id.clone(), Arc::clone(&asset));
                info!(
                    "Asset loaded: {:?} | File size: {} KB | {} ms{}",
                    id,
                    bytes / 1024,
                    elapsed.as_millis(),
                    if retained { "" } else { " | not retained" }
                );
                JobState::Loaded(asset)
            }
            Outcome::Failed(err) => {
                if job.origin == LoadOrigin::Prefetch && !job.has_direct_waiters() {
                    self.shared
                        .counters
                        .prefetch_failures
                        .fetch_add(1, Ordering::Relaxed);
                    warn!("Failed to prefetch {:?}: {}", id, err);
                } else {
                    self.shared.counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Failed to load {:?}: {}", id, err);
                }
                JobState::Failed(err)
            }
            Outcome::Cancelled => {
                self.shared.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!("Load #{} of {:?} stopped after cancellation", job.generation, id);
                JobState::Cancelled
            }
        };

        if jobs.get(id).is_some_and(|current| Arc::ptr_eq(current, job)) {
            jobs.remove(id);
            let discarded = cancelled && !matches!(state, JobState::Failed(_));
            if discarded && job.wants_respawn() && !self.is_shut_down() {
                debug!("{:?} re-entered the prefetch window, restarting", id);
                self.register(&mut jobs, id, LoadOrigin::Prefetch);
            }
        }
        drop(jobs);

        job.publish(state);
        self.shared.settled.notify_waiters();
    }
}

/// Cancels `job` unless it is already cancelled with nothing left to undo.
fn signal_cancel<K: Debug, A>(id: &K, job: &LoadJob<A>) -> bool {
    if job.is_cancelled() && !job.wants_respawn() {
        return false;
    }
    debug!("Cancelling load #{} of {:?}", job.generation, id);
    job.cancel();
    true
}
