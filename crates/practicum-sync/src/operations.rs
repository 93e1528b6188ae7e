//! Entry points the screens call. Each validates locally, then hands one
//! intent to the dispatcher; nothing here touches the store directly.
//!
//! The remote call is detached onto the runtime once the target is claimed.
//! Dropping the returned future (a modal closed mid-save) does not stop it:
//! the store is still reconciled or rolled back when the server answers.

use std::future::Future;

use practicum_core::{
    validate_submission, validate_transition, CollectionKey, Entity, InternshipWindow, OperationKind, Student,
    StudentId, StudentPatch, SyncError, VisitLog, VisitLogId, VisitLogPatch, VisitStatus,
};
use practicum_store::SnapshotStore;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{
    dispatcher::MutationDispatcher,
    intent::MutationIntent,
    remote::{Confirmed, RemoteError},
};

/// Body of the activate/deactivate call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub student_id: StudentId,
    pub active: bool,
}

type Settled<T> = Result<Option<T>, SyncError>;

async fn settle<T>(dispatched: Result<JoinHandle<Settled<T>>, SyncError>) -> Settled<T> {
    match dispatched?.await {
        Ok(settled) => settled,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(SyncError::Network { message: err.to_string(), status: None, retryable: true }),
    }
}

fn current<T: Entity, S: SnapshotStore<T>>(store: &S, key: &CollectionKey, id: &T::Id) -> Result<T, SyncError> {
    store.get(key).get(id).cloned().ok_or_else(|| SyncError::UnknownTarget {
        collection: key.to_string(),
        target: id.to_string(),
    })
}

pub fn toggle_student_status<S, R, F>(
    dispatcher: &MutationDispatcher<Student, S>,
    key: &CollectionKey,
    student_id: &StudentId,
    remote: R,
) -> impl Future<Output = Settled<Student>>
where
    S: SnapshotStore<Student> + 'static,
    R: FnOnce(StatusChange) -> F,
    F: Future<Output = Result<Confirmed<Student>, RemoteError>> + Send + 'static,
{
    let dispatched = current(dispatcher.store().as_ref(), key, student_id).and_then(|student| {
        let active = !student.active;
        let patch = StudentPatch { active: Some(active), ..StudentPatch::default() };
        let intent = MutationIntent::patch(OperationKind::ToggleStatus, student_id.clone(), patch);
        let change = StatusChange { student_id: student_id.clone(), active };
        dispatcher.dispatch(key, intent, move || remote(change))
    });
    settle(dispatched)
}

pub fn delete_visit_log<S, R, F>(
    dispatcher: &MutationDispatcher<VisitLog, S>,
    key: &CollectionKey,
    log_id: &VisitLogId,
    remote: R,
) -> impl Future<Output = Settled<VisitLog>>
where
    S: SnapshotStore<VisitLog> + 'static,
    R: FnOnce(VisitLogId) -> F,
    F: Future<Output = Result<Confirmed<VisitLog>, RemoteError>> + Send + 'static,
{
    let dispatched = current(dispatcher.store().as_ref(), key, log_id).and_then(|_| {
        let intent = MutationIntent::remove(OperationKind::DeleteLog, log_id.clone());
        let id = log_id.clone();
        dispatcher.dispatch(key, intent, move || remote(id))
    });
    settle(dispatched)
}

/// Insert `log` at the top of the list while the create call runs. The server
/// usually answers with its own id, which replaces the temporary one.
pub fn create_visit_log<S, R, F>(
    dispatcher: &MutationDispatcher<VisitLog, S>,
    key: &CollectionKey,
    log: VisitLog,
    window: &InternshipWindow,
    remote: R,
) -> impl Future<Output = Settled<VisitLog>>
where
    S: SnapshotStore<VisitLog> + 'static,
    R: FnOnce(VisitLog) -> F,
    F: Future<Output = Result<Confirmed<VisitLog>, RemoteError>> + Send + 'static,
{
    let dispatched = validate_submission(&log, window).map_err(SyncError::from).and_then(|()| {
        let body = log.clone();
        dispatcher.dispatch(key, MutationIntent::insert(OperationKind::CreateLog, log), move || remote(body))
    });
    settle(dispatched)
}

pub fn update_visit_log<S, R, F>(
    dispatcher: &MutationDispatcher<VisitLog, S>,
    key: &CollectionKey,
    log_id: &VisitLogId,
    patch: VisitLogPatch,
    window: &InternshipWindow,
    remote: R,
) -> impl Future<Output = Settled<VisitLog>>
where
    S: SnapshotStore<VisitLog> + 'static,
    R: FnOnce(VisitLogId, VisitLogPatch) -> F,
    F: Future<Output = Result<Confirmed<VisitLog>, RemoteError>> + Send + 'static,
{
    let dispatched = check_update(dispatcher.store().as_ref(), key, log_id, &patch, window).and_then(|()| {
        let (id, body) = (log_id.clone(), patch.clone());
        let intent = MutationIntent::patch(OperationKind::UpdateLog, log_id.clone(), patch);
        dispatcher.dispatch(key, intent, move || remote(id, body))
    });
    settle(dispatched)
}

/// Status-only update: schedule, complete or cancel a log.
pub fn transition_visit_log<S, R, F>(
    dispatcher: &MutationDispatcher<VisitLog, S>,
    key: &CollectionKey,
    log_id: &VisitLogId,
    to: VisitStatus,
    window: &InternshipWindow,
    remote: R,
) -> impl Future<Output = Settled<VisitLog>>
where
    S: SnapshotStore<VisitLog> + 'static,
    R: FnOnce(VisitLogId, VisitLogPatch) -> F,
    F: Future<Output = Result<Confirmed<VisitLog>, RemoteError>> + Send + 'static,
{
    let patch = VisitLogPatch { status: Some(to), ..VisitLogPatch::default() };
    update_visit_log(dispatcher, key, log_id, patch, window, remote)
}

fn check_update<S: SnapshotStore<VisitLog>>(
    store: &S,
    key: &CollectionKey,
    log_id: &VisitLogId,
    patch: &VisitLogPatch,
    window: &InternshipWindow,
) -> Result<(), SyncError> {
    let before = current(store, key, log_id)?;
    let mut after = before.clone();
    after.apply_patch(patch);

    if after.status != before.status {
        // Edge and location are judged on the edited log in its old status,
        // so a location added by the same patch counts.
        let mut probe = after.clone();
        probe.status = before.status;
        validate_transition(&probe, after.status)?;
    }
    validate_submission(&after, window)?;
    Ok(())
}
