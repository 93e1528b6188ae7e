use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use practicum_core::{CollectionKey, CollectionSnapshot, Entity};
use tracing::trace;

use crate::traits::SnapshotStore;

/// Process-local store. This is the only store the client layer needs: the
/// server is the durable copy.
pub struct InMemorySnapshotStore<T> {
    inner: Mutex<HashMap<CollectionKey, CollectionSnapshot<T>>>,
}

impl<T> Default for InMemorySnapshotStore<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl<T: Entity> InMemorySnapshotStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one collection.
    pub fn with_collection(key: CollectionKey, snapshot: CollectionSnapshot<T>) -> Self {
        let store = Self::new();
        store.replace(&key, snapshot);
        store
    }

    // Writes are whole-snapshot transitions; a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CollectionKey, CollectionSnapshot<T>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Entity> SnapshotStore<T> for InMemorySnapshotStore<T> {
    fn get(&self, key: &CollectionKey) -> CollectionSnapshot<T> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    fn replace(&self, key: &CollectionKey, snapshot: CollectionSnapshot<T>) {
        trace!(collection = %key, items = snapshot.items.len(), "replace snapshot");
        self.lock().insert(key.clone(), snapshot);
    }

    fn patch_item(&self, key: &CollectionKey, id: &T::Id, patch: &T::Patch) -> bool {
        let mut inner = self.lock();
        match inner.get_mut(key) {
            Some(snap) => snap.patch_item(id, patch),
            None => false,
        }
    }

    fn remove_item(&self, key: &CollectionKey, id: &T::Id) -> Option<T> {
        let mut inner = self.lock();
        inner.get_mut(key).and_then(|snap| snap.remove_item(id))
    }

    fn upsert_item(&self, key: &CollectionKey, item: T) {
        let mut inner = self.lock();
        inner.entry(key.clone()).or_default().upsert_item(item);
    }

    fn keys(&self) -> Vec<CollectionKey> {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn update<R, F>(&self, key: &CollectionKey, f: F) -> R
    where
        F: FnOnce(&mut CollectionSnapshot<T>) -> R,
    {
        let mut inner = self.lock();
        f(inner.entry(key.clone()).or_default())
    }
}
