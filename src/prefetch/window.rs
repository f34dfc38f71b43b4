//! Prefetch Window
//!
//! Computes which identifiers around the focus should be warm and reconciles
//! that set against the jobs currently registered.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use tokio::sync::Mutex;
use tracing::debug;

use crate::loader::LoadCoordinator;

// == Window ==
/// The focus position inside an ordered identifier list, plus a radius.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window<K> {
    focus: K,
    ordered: Vec<K>,
    radius: usize,
}

impl<K> Window<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(focus: K, ordered: Vec<K>, radius: usize) -> Self {
        Self {
            focus,
            ordered,
            radius,
        }
    }

    pub fn focus(&self) -> &K {
        &self.focus
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Position of the focus in the list (first occurrence).
    pub fn focus_index(&self) -> Option<usize> {
        self.ordered.iter().position(|k| *k == self.focus)
    }

    // == Targets ==
    /// The identifiers within `radius` of the focus, clamped at the list
    /// bounds and excluding the focus itself.
    ///
    /// Ordered nearest first, the following neighbor before the preceding one.
    /// Empty when the focus is not in the list.
    pub fn targets(&self) -> Vec<K> {
        let Some(index) = self.focus_index() else {
            return Vec::new();
        };

        let len = self.ordered.len();
        let mut targets: Vec<K> = Vec::new();
        for distance in 1..=self.radius {
            let after = index.checked_add(distance).filter(|i| *i < len);
            let before = index.checked_sub(distance);
            if after.is_none() && before.is_none() {
                break;
            }

            for position in [after, before].into_iter().flatten() {
                let id = &self.ordered[position];
                if *id != self.focus && !targets.contains(id) {
                    targets.push(id.clone());
                }
            }
        }
        targets
    }

    /// Targets plus the focus: everything whose in-flight load should survive.
    pub fn keep_set(&self) -> HashSet<K> {
        let mut keep: HashSet<K> = self.targets().into_iter().collect();
        keep.insert(self.focus.clone());
        keep
    }
}

/// What a reconciliation did, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome<K> {
    /// Jobs signalled to stop because they left the window
    pub cancelled: Vec<K>,
    /// Prefetch jobs registered for the new window
    pub started: Vec<K>,
}

// == Prefetch Window ==
/// Drives background loads from focus changes.
pub struct PrefetchWindow<K, A> {
    coordinator: LoadCoordinator<K, A>,
    /// Last reconciled window; the lock also serializes reconciliations
    current: Mutex<Option<Window<K>>>,
}

impl<K, A> PrefetchWindow<K, A>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    pub fn new(coordinator: LoadCoordinator<K, A>) -> Self {
        Self {
            coordinator,
            current: Mutex::new(None),
        }
    }

    // == Reconcile ==
    /// Moves the window: cancels loads that are neither targets nor the
    /// focus, then starts loads for targets that are neither resident nor
    /// loading. Started loads are never awaited here.
    ///
    /// Concurrent calls run one after another; the last one wins.
    pub async fn reconcile(&self, window: Window<K>) -> ReconcileOutcome<K> {
        let mut current = self.current.lock().await;

        let keep = window.keep_set();
        let cancelled = self
            .coordinator
            .cancel_where(|id| !keep.contains(id))
            .await;

        let mut started = Vec::new();
        for id in window.targets() {
            if self.coordinator.prefetch(&id).await {
                started.push(id);
            }
        }

        debug!(
            "Focus {:?} (radius {}): cancelled {} load(s), started {}",
            window.focus(),
            window.radius(),
            cancelled.len(),
            started.len()
        );
        *current = Some(window);

        ReconcileOutcome { cancelled, started }
    }

    pub async fn current(&self) -> Option<Window<K>> {
        self.current.lock().await.clone()
    }

    /// Forgets the last window (after the identifier list is discarded).
    pub async fn reset(&self) {
        *self.current.lock().await = None;
    }
}
