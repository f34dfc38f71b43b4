//! Load Job Module
//!
//! A registered fetch+decode for one identifier and the slot its waiters watch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;

/// Who registered a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// A caller awaiting the asset right now
    Direct,
    /// Window reconciliation; nobody awaits the result
    Prefetch,
}

// == Job State ==
/// Result slot of a load job.
#[derive(Debug)]
pub enum JobState<A> {
    Pending,
    Loaded(Arc<A>),
    Failed(LoadError),
    Cancelled,
}

impl<A> JobState<A> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

impl<A> Clone for JobState<A> {
    fn clone(&self) -> Self {
        match self {
            JobState::Pending => JobState::Pending,
            JobState::Loaded(asset) => JobState::Loaded(Arc::clone(asset)),
            JobState::Failed(err) => JobState::Failed(err.clone()),
            JobState::Cancelled => JobState::Cancelled,
        }
    }
}

// == Load Job ==
/// One in-flight load. Lives in the coordinator's registry until it settles.
#[derive(Debug)]
pub(crate) struct LoadJob<A> {
    /// Distinguishes successive jobs registered under the same identifier
    pub generation: u64,
    pub origin: LoadOrigin,
    cancel: CancellationToken,
    state: watch::Sender<JobState<A>>,
    /// Direct callers that attached to this job
    direct_waiters: AtomicUsize,
    /// Set when a cancelled job's identifier re-entered the prefetch window
    respawn: AtomicBool,
}

impl<A> LoadJob<A> {
    pub fn new(generation: u64, origin: LoadOrigin) -> Self {
        let (state, _) = watch::channel(JobState::Pending);
        Self {
            generation,
            origin,
            cancel: CancellationToken::new(),
            state,
            direct_waiters: AtomicUsize::new(0),
            respawn: AtomicBool::new(false),
        }
    }

    // == Cancellation ==
    pub fn cancel(&self) {
        self.respawn.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn request_respawn(&self) {
        self.respawn.store(true, Ordering::SeqCst);
    }

    pub fn wants_respawn(&self) -> bool {
        self.respawn.load(Ordering::SeqCst)
    }

    // == Waiters ==
    /// Counts a direct caller as attached until the returned guard drops,
    /// including when the caller abandons its `load` future.
    pub fn attach_direct(self: &Arc<Self>) -> DirectWaiter<A> {
        self.direct_waiters.fetch_add(1, Ordering::SeqCst);
        DirectWaiter {
            job: Arc::clone(self),
        }
    }

    pub fn has_direct_waiters(&self) -> bool {
        self.direct_waiters.load(Ordering::SeqCst) > 0
    }

    // == Settlement ==
    /// Publishes the final state to every current and future waiter.
    pub fn publish(&self, state: JobState<A>) {
        self.state.send_replace(state);
    }

    /// Waits until the job settles and returns its final state.
    pub async fn wait(&self) -> JobState<A> {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(JobState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => JobState::Failed(LoadError::Internal(
                "load job dropped before settling".to_string(),
            )),
        };
        state
    }
}

/// Attachment of one direct caller to a job.
pub(crate) struct DirectWaiter<A> {
    job: Arc<LoadJob<A>>,
}

impl<A> DirectWaiter<A> {
    pub fn job(&self) -> &Arc<LoadJob<A>> {
        &self.job
    }
}

impl<A> Drop for DirectWaiter<A> {
    fn drop(&mut self) {
        self.job.direct_waiters.fetch_sub(1, Ordering::SeqCst);
    }
}
