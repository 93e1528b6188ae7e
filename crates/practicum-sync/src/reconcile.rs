//! Commit and rollback of a settled mutation.
//!
//! Both work on the target item only. Anything else that happened to the
//! collection while the call was in flight (other targets' optimistic
//! patches, a page appended) is left alone. When nothing else happened,
//! rollback yields a snapshot deep-equal to the one captured before the
//! optimistic change.

use practicum_core::{CollectionKey, CollectionSnapshot, Entity};
use practicum_store::SnapshotStore;

use crate::{intent::*, remote::Confirmed};

/// Merge the server's answer. Server data wins over the optimistic patch.
/// Returns the canonical item, if there is one.
pub fn commit<T, S>(store: &S, key: &CollectionKey, intent: &MutationIntent<T>, confirmed: Confirmed<T>) -> Option<T>
where
    T: Entity,
    S: SnapshotStore<T>,
{
    store.update(key, |snap| {
        if matches!(intent.optimistic, Optimistic::Remove) {
            // Whatever the body says, a confirmed delete stays deleted.
            snap.remove_item(&intent.target_id);
            return match confirmed {
                Confirmed::Item(item) => Some(item),
                _ => None,
            };
        }
        match confirmed {
            Confirmed::Item(item) => {
                // Only merge where the optimistic copy still sits; if a reload
                // dropped it from this view the server list is already current.
                snap.replace_at(&intent.target_id, item.clone());
                Some(item)
            }
            Confirmed::Removed => {
                snap.remove_item(&intent.target_id);
                None
            }
            Confirmed::Accepted => snap.get(&intent.target_id).cloned(),
        }
    })
}

/// Restore the target to its pre-mutation state and position.
pub fn rollback<T, S>(store: &S, key: &CollectionKey, target: &T::Id, previous: &CollectionSnapshot<T>)
where
    T: Entity,
    S: SnapshotStore<T>,
{
    store.update(key, |snap| restore_target(snap, target, previous));
}

pub(crate) fn restore_target<T: Entity>(snap: &mut CollectionSnapshot<T>, target: &T::Id, previous: &CollectionSnapshot<T>) {
    let same_view = snap.filter_key == previous.filter_key;
    match previous.position(target) {
        Some(idx) => {
            let before = previous.items[idx].clone();
            if !snap.replace_at(target, before.clone()) && same_view {
                snap.insert_at(idx, before);
            }
        }
        None => {
            snap.remove_item(target);
        }
    }
}
