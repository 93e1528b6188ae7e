use practicum_core::{CollectionKey, CollectionSnapshot, Entity};

/// Holds the current materialized view of each collection.
///
/// Every operation is a synchronous state transition with no I/O. Reads hand
/// out snapshots by value so callers never alias store state. Only the
/// dispatcher and paginator are expected to write; UI code reads.
pub trait SnapshotStore<T: Entity>: Send + Sync {
    /// Current snapshot, or an empty one for an unknown key.
    fn get(&self, key: &CollectionKey) -> CollectionSnapshot<T>;

    fn replace(&self, key: &CollectionKey, snapshot: CollectionSnapshot<T>);

    /// Returns false (and changes nothing) when `id` is not present.
    fn patch_item(&self, key: &CollectionKey, id: &T::Id, patch: &T::Patch) -> bool;

    fn remove_item(&self, key: &CollectionKey, id: &T::Id) -> Option<T>;

    fn upsert_item(&self, key: &CollectionKey, item: T);

    fn keys(&self) -> Vec<CollectionKey>;

    /// Run `f` against the live snapshot under the store's lock.
    fn update<R, F>(&self, key: &CollectionKey, f: F) -> R
    where
        F: FnOnce(&mut CollectionSnapshot<T>) -> R,
        Self: Sized;
}
