//! Scripted replays: seed the collections, run each step against the real
//! dispatcher and paginator with a canned server answer, report what the
//! store looked like afterwards.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use practicum_core::{
    CollectionKey, CollectionSnapshot, InternshipWindow, Student, StudentId, StudentQuery, SyncError, VisitLog,
    VisitLogId, VisitLogPatch, VisitStatus,
};
use practicum_store::{InMemorySnapshotStore, SnapshotStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    dispatcher::MutationDispatcher,
    operations,
    paginator::{CursorPaginator, LoadOptions},
    remote::{Confirmed, Page, PageRequest, RemoteError},
};

pub const STUDENTS: &str = "students";
pub const VISIT_LOGS: &str = "visit-logs";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub window: InternshipWindow,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub visit_logs: Vec<VisitLog>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioStep {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub expect: Option<Expected>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    ToggleStudent { student: StudentId, outcome: Scripted<Student> },
    DeleteVisitLog { log: VisitLogId, outcome: Scripted<VisitLog> },
    CreateVisitLog { log: VisitLog, outcome: Scripted<VisitLog> },
    UpdateVisitLog { log: VisitLogId, patch: VisitLogPatch, outcome: Scripted<VisitLog> },
    TransitionVisitLog { log: VisitLogId, to: VisitStatus, outcome: Scripted<VisitLog> },
    LoadStudents {
        #[serde(default)]
        query: StudentQuery,
        #[serde(default)]
        more: bool,
        response: ScriptedPage,
    },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::ToggleStudent { .. } => "toggle_student",
            Action::DeleteVisitLog { .. } => "delete_visit_log",
            Action::CreateVisitLog { .. } => "create_visit_log",
            Action::UpdateVisitLog { .. } => "update_visit_log",
            Action::TransitionVisitLog { .. } => "transition_visit_log",
            Action::LoadStudents { .. } => "load_students",
        }
    }
}

/// Canned server answer to a mutation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scripted<T> {
    Accept,
    Removed,
    Return(T),
    Fail { status: u16, message: String },
    Timeout,
}

impl<T> Scripted<T> {
    fn into_result(self) -> Result<Confirmed<T>, RemoteError> {
        match self {
            Scripted::Accept => Ok(Confirmed::Accepted),
            Scripted::Removed => Ok(Confirmed::Removed),
            Scripted::Return(item) => Ok(Confirmed::Item(item)),
            Scripted::Fail { status, message } => Err(RemoteError::status(status, message)),
            Scripted::Timeout => Err(RemoteError::timeout("scripted timeout")),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedPage {
    Page(Page<Student>),
    Fail { status: u16, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Committed,
    RolledBack,
    Rejected,
    Loaded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Committed,
    /// Remote failure; the optimistic change was undone.
    RolledBack { error: String, retryable: bool },
    /// Refused locally; nothing was applied.
    Rejected { error: String },
    Loaded { total: usize, has_more: bool },
    LoadFailed { error: String },
}

impl StepResult {
    fn from_mutation<T>(result: Result<Option<T>, SyncError>) -> Self {
        match result {
            Ok(_) => StepResult::Committed,
            Err(err @ SyncError::Network { .. }) => {
                StepResult::RolledBack { retryable: err.is_retryable(), error: err.to_string() }
            }
            Err(err) => StepResult::Rejected { error: err.to_string() },
        }
    }

    fn matches(&self, expected: Expected) -> bool {
        matches!(
            (self, expected),
            (StepResult::Committed, Expected::Committed)
                | (StepResult::RolledBack { .. }, Expected::RolledBack)
                | (StepResult::Rejected { .. }, Expected::Rejected)
                | (StepResult::Loaded { .. }, Expected::Loaded)
                | (StepResult::LoadFailed { .. }, Expected::Failed)
        )
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub result: StepResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Expected>,
}

impl StepReport {
    pub fn is_mismatch(&self) -> bool {
        self.expected.is_some_and(|e| !self.result.matches(e))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub students: CollectionSnapshot<Student>,
    pub visit_logs: CollectionSnapshot<VisitLog>,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> Vec<&StepReport> {
        self.steps.iter().filter(|s| s.is_mismatch()).collect()
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read scenario: {}", path.display()))?;
    let scenario: Scenario =
        serde_yaml::from_str(&s).with_context(|| format!("parse scenario: {}", path.display()))?;
    Ok(scenario)
}

pub async fn simulate(path: &Path) -> Result<ScenarioReport> {
    let scenario = load_scenario(path)?;
    Ok(run_scenario(scenario).await)
}

pub async fn run_scenario(scenario: Scenario) -> ScenarioReport {
    let students_key = CollectionKey::new(STUDENTS);
    let logs_key = CollectionKey::new(VISIT_LOGS);

    let students = Arc::new(InMemorySnapshotStore::with_collection(
        students_key.clone(),
        CollectionSnapshot::from_items(scenario.students),
    ));
    let logs = Arc::new(InMemorySnapshotStore::with_collection(
        logs_key.clone(),
        CollectionSnapshot::from_items(scenario.visit_logs),
    ));
    let student_dispatcher = MutationDispatcher::new(Arc::clone(&students));
    let log_dispatcher = MutationDispatcher::new(Arc::clone(&logs));
    let paginator = CursorPaginator::new(Arc::clone(&students), scenario.page_size.unwrap_or(20));
    let window = scenario.window;

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.into_iter().enumerate() {
        let op = step.action.name();
        let result = match step.action {
            Action::ToggleStudent { student, outcome } => StepResult::from_mutation(
                operations::toggle_student_status(&student_dispatcher, &students_key, &student, |_| async move {
                    outcome.into_result()
                })
                .await,
            ),
            Action::DeleteVisitLog { log, outcome } => StepResult::from_mutation(
                operations::delete_visit_log(&log_dispatcher, &logs_key, &log, |_| async move { outcome.into_result() })
                    .await,
            ),
            Action::CreateVisitLog { log, outcome } => StepResult::from_mutation(
                operations::create_visit_log(&log_dispatcher, &logs_key, log, &window, |_| async move {
                    outcome.into_result()
                })
                .await,
            ),
            Action::UpdateVisitLog { log, patch, outcome } => StepResult::from_mutation(
                operations::update_visit_log(&log_dispatcher, &logs_key, &log, patch, &window, |_, _| async move {
                    outcome.into_result()
                })
                .await,
            ),
            Action::TransitionVisitLog { log, to, outcome } => StepResult::from_mutation(
                operations::transition_visit_log(&log_dispatcher, &logs_key, &log, to, &window, |_, _| async move {
                    outcome.into_result()
                })
                .await,
            ),
            Action::LoadStudents { query, more, response } => {
                let scripted = match response {
                    ScriptedPage::Page(page) => Ok(page),
                    ScriptedPage::Fail { status, message } => Err(RemoteError::status(status, message)),
                };
                let fetch = move |_: PageRequest<StudentQuery>| {
                    let answer = scripted.clone();
                    async move { answer }
                };
                let opts = if more { LoadOptions::more() } else { LoadOptions::first_page() };
                match paginator.load_page(&students_key, &query, opts, &fetch).await {
                    Ok(snap) => StepResult::Loaded { total: snap.len(), has_more: snap.has_more },
                    Err(err) => StepResult::LoadFailed { error: err.to_string() },
                }
            }
        };
        info!(scenario = %scenario.name, index, op, ?result, "step finished");
        steps.push(StepReport { index, op, result, expected: step.expect });
    }

    ScenarioReport {
        name: scenario.name,
        steps,
        students: students.get(&students_key),
        visit_logs: logs.get(&logs_key),
    }
}
