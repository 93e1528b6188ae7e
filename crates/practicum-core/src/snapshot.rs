use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{entity::Entity, filter::FilterKey, ids::Cursor};

/// Materialized view of one collection plus its pagination and loading state.
///
/// `items` never contains two entries with the same id; every mutating helper
/// here preserves that.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot<T> {
    pub items: Vec<T>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
    pub filter_key: FilterKey,
}

impl<T> Default for CollectionSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            has_more: false,
            loading: false,
            loading_more: false,
            error: None,
            filter_key: FilterKey::default(),
        }
    }
}

impl<T: Entity> CollectionSnapshot<T> {
    /// Snapshot seeded with already-known items (e.g. a non-paginated list
    /// fetched in one go). Duplicates collapse onto the first position.
    pub fn from_items(items: Vec<T>) -> Self {
        let mut s = Self::default();
        s.merge_page(items);
        s
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|it| it.id() == id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|it| it.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    /// Apply a partial update. Missing ids are ignored: the item may have been
    /// deleted while the patch was on its way.
    pub fn patch_item(&mut self, id: &T::Id, patch: &T::Patch) -> bool {
        match self.items.iter_mut().find(|it| it.id() == id) {
            Some(item) => {
                item.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, id: &T::Id) -> Option<T> {
        self.position(id).map(|i| self.items.remove(i))
    }

    /// Replace in place when the id is known, append otherwise.
    pub fn upsert_item(&mut self, item: T) {
        match self.position(item.id()) {
            Some(i) => self.items[i] = item,
            None => self.items.push(item),
        }
    }

    /// Put `item` where `target` currently sits. Used when the server hands
    /// back an entity under a different id than the optimistic one. Any other
    /// copy of `item`'s id is dropped so ids stay unique. Returns false if
    /// `target` is not present (nothing is inserted).
    pub fn replace_at(&mut self, target: &T::Id, item: T) -> bool {
        let Some(pos) = self.position(target) else {
            return false;
        };
        let new_id = item.id().clone();
        self.items[pos] = item;
        let mut idx = 0;
        self.items.retain(|it| {
            let keep = idx == pos || it.id() != &new_id;
            idx += 1;
            keep
        });
        true
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert_at(&mut self, index: usize, item: T) {
        if let Some(i) = self.position(item.id()) {
            self.items[i] = item;
            return;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Append a page in server order. A duplicate id replaces the earlier copy
    /// where it stands instead of being appended again.
    pub fn merge_page(&mut self, page: Vec<T>) {
        for item in page {
            self.upsert_item(item);
        }
    }

    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items.iter().all(|it| seen.insert(it.id().clone()))
    }

    /// A snapshot that has never been loaded or seeded: nothing to page from.
    pub fn is_pristine(&self) -> bool {
        self.items.is_empty() && self.cursor.is_none() && !self.has_more && self.filter_key.is_empty()
    }
}
