use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use practicum_core::{CollectionKey, CollectionSnapshot, Entity, SyncError};
use practicum_store::SnapshotStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    classify::to_sync_error,
    intent::*,
    reconcile,
    remote::{Confirmed, RemoteError},
};

struct Shared<T: Entity, S> {
    store: Arc<S>,
    in_flight: Mutex<HashMap<CollectionKey, HashSet<T::Id>>>,
}

impl<T: Entity, S> Shared<T, S> {
    fn release(&self, key: &CollectionKey, target: &T::Id) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ids) = in_flight.get_mut(key) {
            ids.remove(target);
            if ids.is_empty() {
                in_flight.remove(key);
            }
        }
    }
}

/// Runs named mutations optimistically against a `SnapshotStore`, then
/// reconciles or rolls back once the remote call settles.
///
/// At most one mutation per `(collection, target)` is in flight. A second one
/// is refused immediately with `ConcurrentMutation`; it is never queued.
///
/// There is no internal timeout. A remote call that never resolves leaves its
/// optimistic change in place and keeps the target locked; wrap calls in
/// [`crate::with_timeout`] to bound that.
pub struct MutationDispatcher<T: Entity, S> {
    shared: Arc<Shared<T, S>>,
}

impl<T: Entity, S> Clone for MutationDispatcher<T, S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: Entity, S: SnapshotStore<T>> MutationDispatcher<T, S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { shared: Arc::new(Shared { store, in_flight: Mutex::new(HashMap::new()) }) }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    pub fn is_pending(&self, key: &CollectionKey, target: &T::Id) -> bool {
        self.in_flight().get(key).is_some_and(|ids| ids.contains(target))
    }

    pub fn pending_count(&self, key: &CollectionKey) -> usize {
        self.in_flight().get(key).map_or(0, HashSet::len)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CollectionKey, HashSet<T::Id>>> {
        self.shared.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Synchronous first half of a mutation: claim the target, capture the
    /// current snapshot and apply the optimistic change.
    pub fn begin(&self, key: &CollectionKey, intent: MutationIntent<T>) -> Result<PendingMutation<T, S>, SyncError> {
        {
            let mut in_flight = self.in_flight();
            let ids = in_flight.entry(key.clone()).or_default();
            if ids.contains(&intent.target_id) {
                debug!(collection = %key, target = %intent.target_id, op = %intent.operation, "rejecting overlapping mutation");
                return Err(SyncError::ConcurrentMutation {
                    collection: key.to_string(),
                    target: intent.target_id.to_string(),
                });
            }
            ids.insert(intent.target_id.clone());
        }

        let previous = self.shared.store.update(key, |snap| {
            let previous = snap.clone();
            match &intent.optimistic {
                Optimistic::Patch(patch) => {
                    snap.patch_item(&intent.target_id, patch);
                }
                Optimistic::Remove => {
                    snap.remove_item(&intent.target_id);
                }
                Optimistic::Insert(item) => snap.insert_at(0, item.clone()),
            }
            previous
        });
        debug!(
            collection = %key,
            target = %intent.target_id,
            op = %intent.operation,
            operation_id = %intent.operation_id,
            "optimistic change applied"
        );

        Ok(PendingMutation { shared: Arc::clone(&self.shared), key: key.clone(), intent, previous, settled: false })
    }

    /// Optimistically apply `intent`, await `remote`, then commit or roll back.
    ///
    /// The claim and optimistic change happen when this is called, not when
    /// the returned future is first polled, so an overlapping call is refused
    /// synchronously. On failure the snapshot is restored before the
    /// classified error is returned.
    pub fn mutate<F>(
        &self,
        key: &CollectionKey,
        intent: MutationIntent<T>,
        remote: F,
    ) -> impl Future<Output = Result<Option<T>, SyncError>>
    where
        F: Future<Output = Result<Confirmed<T>, RemoteError>>,
    {
        let started = self.begin(key, intent).map(|pending| (pending, remote));
        async move {
            let (pending, remote) = started?;
            let result = remote.await;
            pending.settle(result)
        }
    }

    /// Like [`mutate`](Self::mutate) but detached onto the runtime, so the
    /// mutation still reconciles after whatever started it (a modal, a row)
    /// has gone away.
    pub fn spawn_mutate<F>(
        &self,
        key: &CollectionKey,
        intent: MutationIntent<T>,
        remote: F,
    ) -> JoinHandle<Result<Option<T>, SyncError>>
    where
        S: 'static,
        F: Future<Output = Result<Confirmed<T>, RemoteError>> + Send + 'static,
    {
        tokio::spawn(self.mutate(key, intent, remote))
    }

    /// Claim the target and apply the optimistic change, then build the
    /// remote call with `remote` and detach it onto the runtime.
    ///
    /// `remote` only runs once the claim has succeeded, so a refused call has
    /// no side effects.
    pub fn dispatch<R, F>(
        &self,
        key: &CollectionKey,
        intent: MutationIntent<T>,
        remote: R,
    ) -> Result<JoinHandle<Result<Option<T>, SyncError>>, SyncError>
    where
        S: 'static,
        R: FnOnce() -> F,
        F: Future<Output = Result<Confirmed<T>, RemoteError>> + Send + 'static,
    {
        let pending = self.begin(key, intent)?;
        let call = remote();
        Ok(tokio::spawn(async move {
            let result = call.await;
            pending.settle(result)
        }))
    }
}

/// A mutation whose optimistic change is applied and whose remote call has
/// not settled yet. Owns the pre-mutation snapshot.
///
/// Dropping it unsettled rolls the target back and frees the claim.
pub struct PendingMutation<T: Entity, S: SnapshotStore<T>> {
    shared: Arc<Shared<T, S>>,
    key: CollectionKey,
    intent: MutationIntent<T>,
    previous: CollectionSnapshot<T>,
    settled: bool,
}

impl<T: Entity, S: SnapshotStore<T>> PendingMutation<T, S> {
    pub fn intent(&self) -> &MutationIntent<T> {
        &self.intent
    }

    pub fn previous(&self) -> &CollectionSnapshot<T> {
        &self.previous
    }

    /// Second half of a mutation. The target stays claimed until the store
    /// has been reconciled, so a follow-up mutation never sees a half-settled
    /// item.
    pub fn settle(mut self, result: Result<Confirmed<T>, RemoteError>) -> Result<Option<T>, SyncError> {
        let store = &*self.shared.store;
        let outcome = match result {
            Ok(confirmed) => {
                let item = reconcile::commit(store, &self.key, &self.intent, confirmed);
                info!(
                    collection = %self.key,
                    target = %self.intent.target_id,
                    op = %self.intent.operation,
                    "mutation committed"
                );
                Ok(item)
            }
            Err(err) => {
                reconcile::rollback(store, &self.key, &self.intent.target_id, &self.previous);
                warn!(
                    collection = %self.key,
                    target = %self.intent.target_id,
                    op = %self.intent.operation,
                    err = %err,
                    "mutation rolled back"
                );
                Err(to_sync_error(err))
            }
        };
        self.shared.release(&self.key, &self.intent.target_id);
        self.settled = true;
        outcome
    }
}

impl<T: Entity, S: SnapshotStore<T>> Drop for PendingMutation<T, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Dropped before the remote call settled: nothing will reconcile the
        // optimistic change, so undo it before freeing the target.
        reconcile::rollback(&*self.shared.store, &self.key, &self.intent.target_id, &self.previous);
        self.shared.release(&self.key, &self.intent.target_id);
        warn!(
            collection = %self.key,
            target = %self.intent.target_id,
            op = %self.intent.operation,
            "pending mutation dropped before settling; rolled back"
        );
    }
}
