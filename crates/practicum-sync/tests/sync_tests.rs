use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use practicum_core::{
    ApplicationId, CollectionKey, CollectionSnapshot, Cursor, InternshipPhase, OperationKind, Student, StudentId,
    StudentPatch, StudentQuery, SyncError, VisitLog, VisitLogId, VisitStatus, VisitType,
};
use practicum_store::{InMemorySnapshotStore, SnapshotStore};
use practicum_sync::{
    delete_visit_log, toggle_student_status, with_timeout, Confirmed, CursorPaginator, LoadOptions, MutationDispatcher,
    MutationIntent, Page, PageRequest, RemoteError,
};
use serde::Serialize;
use tokio::sync::oneshot;

type Store = InMemorySnapshotStore<Student>;

fn student(id: &str, active: bool) -> Student {
    Student {
        id: StudentId::from(id),
        name: format!("Student {id}"),
        roll_number: None,
        email: None,
        department: None,
        batch: None,
        internship_phase: if active { InternshipPhase::Active } else { InternshipPhase::Inactive },
        application_status: None,
        active,
    }
}

fn seeded(items: Vec<Student>) -> (Arc<Store>, CollectionKey) {
    let key = CollectionKey::new("students");
    let store = Arc::new(InMemorySnapshotStore::with_collection(key.clone(), CollectionSnapshot::from_items(items)));
    (store, key)
}

fn deactivate(id: &str) -> MutationIntent<Student> {
    MutationIntent::patch(
        OperationKind::ToggleStatus,
        StudentId::from(id),
        StudentPatch { active: Some(false), ..Default::default() },
    )
}

fn page(ids: &[&str], next: Option<&str>, has_more: bool) -> Page<Student> {
    Page {
        items: ids.iter().map(|id| student(id, true)).collect(),
        next_cursor: next.map(Cursor::from),
        has_more,
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogQuery {
    application_id: String,
}

fn visit_log(id: &str) -> VisitLog {
    VisitLog {
        id: VisitLogId::from(id),
        application_id: ApplicationId::from("A1"),
        visit_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(10, 0, 0).unwrap(),
        status: VisitStatus::Draft,
        visit_type: VisitType::Virtual,
        visit_location: None,
        coordinates: None,
        photos: vec![],
        signed_document_url: None,
        project_fields: Default::default(),
        observation_fields: Default::default(),
        next_visit_date: None,
        follow_up_required: false,
    }
}

fn log_page(ids: &[&str], next: Option<&str>, has_more: bool) -> Page<VisitLog> {
    Page { items: ids.iter().map(|id| visit_log(id)).collect(), next_cursor: next.map(Cursor::from), has_more }
}

fn log_ids(snap: &CollectionSnapshot<VisitLog>) -> Vec<&str> {
    snap.items.iter().map(|v| v.id.as_str()).collect()
}

#[tokio::test]
async fn test_toggle_failure_reverts_and_reports() {
    let (store, key) = seeded(vec![student("S1", true), student("S2", true)]);
    let before = store.get(&key);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let (tx, rx) = oneshot::channel::<()>();
    let call = toggle_student_status(&dispatcher, &key, &StudentId::from("S1"), |_| async move {
        let _ = rx.await;
        Err(RemoteError::status(500, "internal server error"))
    });

    // Applied before the server answers.
    assert!(!store.get(&key).get(&StudentId::from("S1")).unwrap().active);

    tx.send(()).unwrap();
    let err = call.await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Network { message: "internal server error".into(), status: Some(500), retryable: true }
    );
    assert_eq!(store.get(&key), before);
    assert!(!dispatcher.is_pending(&key, &StudentId::from("S1")));
}

#[tokio::test]
async fn test_second_mutation_on_same_target_is_refused() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let pending = dispatcher.begin(&key, deactivate("S1")).unwrap();
    let optimistic = store.get(&key);

    let err = dispatcher
        .mutate(&key, deactivate("S1"), async { Ok(Confirmed::Accepted) })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ConcurrentMutation { .. }));
    assert_eq!(store.get(&key), optimistic);

    pending.settle(Ok(Confirmed::Accepted)).unwrap();
    assert_eq!(dispatcher.pending_count(&key), 0);
    // Free again once settled.
    dispatcher.begin(&key, deactivate("S1")).unwrap().settle(Ok(Confirmed::Accepted)).unwrap();
}

#[tokio::test]
async fn test_different_targets_interleave_and_roll_back_independently() {
    let (store, key) = seeded(vec![student("S1", true), student("S2", true), student("S3", true)]);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let first = dispatcher.begin(&key, deactivate("S1")).unwrap();
    let second = dispatcher.begin(&key, deactivate("S2")).unwrap();
    assert_eq!(dispatcher.pending_count(&key), 2);

    // S2 commits first, then S1 fails.
    second.settle(Ok(Confirmed::Accepted)).unwrap();
    first.settle(Err(RemoteError::status(409, "conflict"))).unwrap_err();

    let snap = store.get(&key);
    assert!(snap.get(&StudentId::from("S1")).unwrap().active);
    assert!(!snap.get(&StudentId::from("S2")).unwrap().active);
    assert!(snap.get(&StudentId::from("S3")).unwrap().active);
    assert!(snap.has_unique_ids());
}

#[tokio::test]
async fn test_server_copy_wins_on_commit() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let mut canonical = student("S1", false);
    canonical.application_status = Some("TERMINATED".into());
    let out = dispatcher
        .mutate(&key, deactivate("S1"), async move { Ok(Confirmed::Item(canonical)) })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.application_status.as_deref(), Some("TERMINATED"));
    assert_eq!(store.get(&key).items, vec![out]);
}

#[tokio::test]
async fn test_spawned_mutation_outlives_its_caller() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let handle = {
        let dispatcher = MutationDispatcher::new(Arc::clone(&store));
        dispatcher.spawn_mutate(&key, deactivate("S1"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(RemoteError::transport("connection reset"))
        })
    };
    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_retryable());
    assert!(store.get(&key).items[0].active);
}

#[tokio::test]
async fn test_timed_out_call_rolls_back() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));
    let hung = async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Confirmed::Accepted)
    };
    let err = dispatcher
        .mutate(&key, deactivate("S1"), with_timeout(Duration::from_millis(5), hung))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Network { status: None, retryable: true, .. }));
    assert!(store.get(&key).items[0].active);
}

#[tokio::test]
async fn test_dropped_pending_mutation_rolls_back_and_frees_target() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let before = store.get(&key);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let fut = dispatcher.mutate(&key, deactivate("S1"), std::future::pending());
    assert!(dispatcher.is_pending(&key, &StudentId::from("S1")));
    assert!(!store.get(&key).items[0].active);
    drop(fut);

    assert!(!dispatcher.is_pending(&key, &StudentId::from("S1")));
    assert_eq!(store.get(&key), before);
}

#[tokio::test]
async fn test_accepted_without_body_returns_optimistic_copy() {
    let (store, key) = seeded(vec![student("S1", true)]);
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));

    let out = dispatcher.mutate(&key, deactivate("S1"), async { Ok(Confirmed::Accepted) }).await.unwrap();
    let out = out.unwrap();
    assert!(!out.active);
    assert_eq!(store.get(&key).items, vec![out]);

    // Target already gone from the view: nothing to hand back.
    let pending = dispatcher.begin(&key, deactivate("S1")).unwrap();
    store.remove_item(&key, &StudentId::from("S1"));
    assert_eq!(pending.settle(Ok(Confirmed::Accepted)).unwrap(), None);
}

#[tokio::test]
async fn test_failed_delete_during_reload_reinserts_at_old_index() {
    let key = CollectionKey::new("visit-logs:A1");
    let store = Arc::new(InMemorySnapshotStore::<VisitLog>::new());
    let dispatcher = MutationDispatcher::new(Arc::clone(&store));
    let paginator = CursorPaginator::new(Arc::clone(&store), 3);
    let query = LogQuery { application_id: "A1".into() };

    let calls = AtomicUsize::new(0);
    let fetch = |req: PageRequest<LogQuery>| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            match (n, req.cursor.as_ref().map(Cursor::as_str)) {
                (0, None) => Ok(log_page(&["V1", "V2", "V3"], Some("c2"), true)),
                // The server has not applied the delete yet but pages past it.
                (1, None) => Ok(log_page(&["V1", "V3", "V4"], Some("c2"), true)),
                (_, Some("c2")) => Ok(log_page(&["V4", "V5"], None, false)),
                _ => Err(RemoteError::status(400, "unexpected request")),
            }
        }
    };

    paginator.load_page(&key, &query, LoadOptions::first_page(), &fetch).await.unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let delete = delete_visit_log(&dispatcher, &key, &VisitLogId::from("V2"), |_| async move {
        let _ = rx.await;
        Err(RemoteError::status(503, "unavailable"))
    });
    assert_eq!(log_ids(&store.get(&key)), ["V1", "V3"]);

    paginator.load_page(&key, &query, LoadOptions::first_page(), &fetch).await.unwrap();
    assert_eq!(log_ids(&store.get(&key)), ["V1", "V3", "V4"]);

    tx.send(()).unwrap();
    let err = delete.await.unwrap_err();
    assert!(err.is_retryable());

    let snap = store.get(&key);
    assert_eq!(log_ids(&snap), ["V1", "V2", "V3", "V4"]);
    assert!(snap.has_unique_ids());

    let snap = paginator.load_page(&key, &query, LoadOptions::more(), &fetch).await.unwrap();
    assert_eq!(log_ids(&snap), ["V1", "V2", "V3", "V4", "V5"]);
    assert!(snap.has_unique_ids());
    assert!(!snap.has_more);
}

#[tokio::test]
async fn test_load_more_dedupes_and_follows_cursor() {
    let store = Arc::new(Store::new());
    let key = CollectionKey::new("students");
    let paginator = CursorPaginator::new(Arc::clone(&store), 2);
    let query = StudentQuery::search("asha");

    let fetch = |req: PageRequest<StudentQuery>| async move {
        assert_eq!(req.limit, 2);
        match req.cursor.as_ref().map(Cursor::as_str) {
            None => Ok(page(&["S1", "S2"], Some("c2"), true)),
            Some("c2") => Ok(page(&["S2", "S3"], None, false)),
            Some(other) => Err(RemoteError::status(400, format!("bad cursor {other}"))),
        }
    };

    paginator.load_page(&key, &query, LoadOptions::first_page(), &fetch).await.unwrap();
    let snap = paginator.load_page(&key, &query, LoadOptions::more(), &fetch).await.unwrap();
    let ids: Vec<_> = snap.items.iter().map(|s| s.id.as_str().to_string()).collect();
    assert_eq!(ids, ["S1", "S2", "S3"]);
    assert!(!snap.has_more);
    assert!(snap.cursor.is_none());

    // Exhausted: no fetch, same snapshot back.
    let again = paginator
        .load_page(&key, &query, LoadOptions::more(), &|_: PageRequest<StudentQuery>| async {
            Err::<Page<Student>, _>(RemoteError::transport("must not be called"))
        })
        .await
        .unwrap();
    assert_eq!(again, snap);
}

#[tokio::test]
async fn test_filter_change_equals_fresh_load() {
    let key = CollectionKey::new("students");
    let fetch = |req: PageRequest<StudentQuery>| async move {
        assert!(req.cursor.is_none(), "a new filter must start without a cursor");
        let dept = req.params.department.unwrap_or_default();
        Ok(page(&[dept.as_str()], Some("next"), true))
    };

    let paged = CursorPaginator::new(Arc::new(Store::new()), 20);
    let cse = StudentQuery { department: Some("CSE".into()), ..Default::default() };
    let ece = StudentQuery { department: Some("ECE".into()), ..Default::default() };
    paged.load_page(&key, &cse, LoadOptions::first_page(), &fetch).await.unwrap();
    let switched = paged.load_page(&key, &ece, LoadOptions::more(), &fetch).await.unwrap();

    let fresh = CursorPaginator::new(Arc::new(Store::new()), 20);
    let direct = fresh.load_page(&key, &ece, LoadOptions::first_page(), &fetch).await.unwrap();

    assert_eq!(switched, direct);
}

#[tokio::test]
async fn test_failed_page_clears_flags_and_sets_error() {
    let store = Arc::new(Store::new());
    let key = CollectionKey::new("students");
    let paginator = CursorPaginator::new(Arc::clone(&store), 20);
    let fail = |_: PageRequest<StudentQuery>| async { Err::<Page<Student>, _>(RemoteError::status(503, "busy")) };

    let err = paginator.load_page(&key, &StudentQuery::default(), LoadOptions::first_page(), &fail).await.unwrap_err();
    assert!(err.is_retryable());
    let snap = store.get(&key);
    assert!(!snap.loading && !snap.loading_more);
    assert_eq!(snap.error.as_deref(), Some("busy"));
}

#[tokio::test]
async fn test_superseded_page_is_discarded() {
    let store = Arc::new(Store::new());
    let key = CollectionKey::new("students");
    let paginator = Arc::new(CursorPaginator::new(Arc::clone(&store), 20));

    let (tx, rx) = oneshot::channel::<()>();
    let rx = std::sync::Mutex::new(Some(rx));
    let slow = move |_: PageRequest<StudentQuery>| {
        let gate = rx.lock().unwrap().take();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(page(&["OLD"], None, false))
        }
    };

    let stale = {
        let paginator = Arc::clone(&paginator);
        let key = key.clone();
        tokio::spawn(async move {
            paginator.load_page(&key, &StudentQuery::search("old"), LoadOptions::first_page(), &slow).await
        })
    };
    while !store.get(&key).loading {
        tokio::task::yield_now().await;
    }

    let current = paginator
        .load_page(&key, &StudentQuery::search("new"), LoadOptions::first_page(), &|_: PageRequest<StudentQuery>| async {
            Ok(page(&["NEW"], None, false))
        })
        .await
        .unwrap();

    tx.send(()).unwrap();
    stale.await.unwrap().unwrap();

    assert_eq!(store.get(&key), current);
    assert_eq!(current.items[0].id.as_str(), "NEW");
}
