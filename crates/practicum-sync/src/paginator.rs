use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use practicum_core::{filter_key, CollectionKey, CollectionSnapshot, Cursor, Entity, FilterKey, SyncError};
use practicum_store::SnapshotStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    classify::to_sync_error,
    remote::{Page, PageFetcher, PageRequest, RemoteError},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub load_more: bool,
}

impl LoadOptions {
    pub fn first_page() -> Self {
        Self { load_more: false }
    }

    pub fn more() -> Self {
        Self { load_more: true }
    }
}

enum Plan<T> {
    Fresh { generation: u64 },
    More { generation: u64, cursor: Cursor },
    /// Nothing to fetch; hand back the current state.
    Skip(CollectionSnapshot<T>),
}

type Generations = Mutex<HashMap<CollectionKey, u64>>;

fn lock(generations: &Generations) -> MutexGuard<'_, HashMap<CollectionKey, u64>> {
    generations.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Loads large filterable collections page by page through opaque cursors.
///
/// The filter key of the params is compared with the stored one on every
/// call: a changed filter always restarts from page 1, whatever the caller
/// asked for, so a cursor can never outlive the query it belongs to.
///
/// Every fresh load bumps a per-collection generation. A page that comes back
/// for an older generation (or for a filter that is no longer current) is
/// dropped on the floor.
pub struct CursorPaginator<T, S> {
    store: Arc<S>,
    generations: Generations,
    page_size: u32,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: SnapshotStore<T>> CursorPaginator<T, S> {
    pub fn new(store: Arc<S>, page_size: u32) -> Self {
        Self { store, generations: Mutex::new(HashMap::new()), page_size: page_size.max(1), _entity: PhantomData }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Forget a collection's pagination state; the next load starts over.
    /// Any page still in flight for it will be discarded.
    pub fn reset(&self, key: &CollectionKey) {
        self.store.update(key, |snap| {
            *snap = CollectionSnapshot::default();
            *lock(&self.generations).entry(key.clone()).or_insert(0) += 1;
        });
        debug!(collection = %key, "pagination reset");
    }

    pub async fn load_page<P, F>(
        &self,
        key: &CollectionKey,
        params: &P,
        opts: LoadOptions,
        fetcher: &F,
    ) -> Result<CollectionSnapshot<T>, SyncError>
    where
        P: Serialize + Clone,
        F: PageFetcher<T, P>,
    {
        let fk = filter_key(params)?;
        let plan = self.store.update(key, |snap| self.plan(key, snap, &fk, opts));

        let (generation, cursor) = match plan {
            Plan::Skip(current) => return Ok(current),
            Plan::Fresh { generation } => (generation, None),
            Plan::More { generation, cursor } => (generation, Some(cursor)),
        };
        let more = cursor.is_some();

        let mut guard = LoadingGuard { paginator: self, key, generation, more, armed: true };
        let result = fetcher.fetch(PageRequest { params: params.clone(), cursor, limit: self.page_size }).await;
        guard.armed = false;

        self.apply(key, generation, &fk, more, result)
    }

    fn current_generation(&self, key: &CollectionKey) -> u64 {
        lock(&self.generations).get(key).copied().unwrap_or(0)
    }

    fn plan(&self, key: &CollectionKey, snap: &mut CollectionSnapshot<T>, fk: &FilterKey, opts: LoadOptions) -> Plan<T> {
        let same_filter = snap.filter_key == *fk;

        if opts.load_more && same_filter {
            if snap.loading || snap.loading_more {
                return Plan::Skip(snap.clone());
            }
            let cursor = match (&snap.cursor, snap.has_more) {
                (Some(c), true) => c.clone(),
                _ => return Plan::Skip(snap.clone()),
            };
            snap.loading_more = true;
            snap.error = None;
            return Plan::More { generation: self.current_generation(key), cursor };
        }

        if opts.load_more {
            debug!(
                collection = %key,
                from = %snap.filter_key,
                to = %fk,
                "filter changed under load-more; restarting from the first page"
            );
        }

        let generation = {
            let mut gens = lock(&self.generations);
            let g = gens.entry(key.clone()).or_insert(0);
            *g += 1;
            *g
        };
        *snap = CollectionSnapshot { loading: true, filter_key: fk.clone(), ..CollectionSnapshot::default() };
        Plan::Fresh { generation }
    }

    fn apply(
        &self,
        key: &CollectionKey,
        generation: u64,
        fk: &FilterKey,
        more: bool,
        result: Result<Page<T>, RemoteError>,
    ) -> Result<CollectionSnapshot<T>, SyncError> {
        self.store.update(key, |snap| {
            if self.current_generation(key) != generation || snap.filter_key != *fk {
                let stale = SyncError::StaleCursor { collection: key.to_string() };
                debug!(collection = %key, generation, "{stale}");
                return Ok(snap.clone());
            }
            match result {
                Ok(page) => {
                    let received = page.items.len();
                    if !more {
                        snap.items.clear();
                    }
                    snap.merge_page(page.items);
                    snap.cursor = page.next_cursor;
                    snap.has_more = page.has_more;
                    snap.loading = false;
                    snap.loading_more = false;
                    snap.error = None;
                    info!(collection = %key, received, total = snap.items.len(), has_more = snap.has_more, "page loaded");
                    Ok(snap.clone())
                }
                Err(err) => {
                    if more {
                        snap.loading_more = false;
                    } else {
                        snap.loading = false;
                    }
                    snap.error = Some(err.message.clone());
                    warn!(collection = %key, err = %err, "page fetch failed");
                    Err(to_sync_error(err))
                }
            }
        })
    }
}

/// Clears the loading flag if the fetch future is dropped before it settles.
struct LoadingGuard<'a, T: Entity, S: SnapshotStore<T>> {
    paginator: &'a CursorPaginator<T, S>,
    key: &'a CollectionKey,
    generation: u64,
    more: bool,
    armed: bool,
}

impl<T: Entity, S: SnapshotStore<T>> Drop for LoadingGuard<'_, T, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let p = self.paginator;
        p.store.update(self.key, |snap| {
            if p.current_generation(self.key) != self.generation {
                return;
            }
            if self.more {
                snap.loading_more = false;
            } else {
                snap.loading = false;
            }
        });
        debug!(collection = %self.key, "page load abandoned");
    }
}
