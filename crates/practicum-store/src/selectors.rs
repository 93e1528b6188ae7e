//! Read-only views for rendering.

use practicum_core::{CollectionKey, CollectionSnapshot, Entity};

use crate::traits::SnapshotStore;

pub fn select<T: Entity, S: SnapshotStore<T> + ?Sized>(store: &S, key: &CollectionKey) -> CollectionSnapshot<T> {
    store.get(key)
}

pub fn select_item<T: Entity, S: SnapshotStore<T> + ?Sized>(store: &S, key: &CollectionKey, id: &T::Id) -> Option<T> {
    store.get(key).get(id).cloned()
}

/// Items matching `pred`, in collection order.
pub fn select_where<T, S, P>(store: &S, key: &CollectionKey, pred: P) -> Vec<T>
where
    T: Entity,
    S: SnapshotStore<T> + ?Sized,
    P: Fn(&T) -> bool,
{
    store.get(key).items.into_iter().filter(|it| pred(it)).collect()
}
