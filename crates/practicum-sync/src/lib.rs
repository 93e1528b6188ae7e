//! Imperative shell of the practicum sync layer: optimistic mutations with
//! rollback, cursor pagination, and the domain operations the UI calls.

pub mod classify;
pub mod config;
pub mod dispatcher;
pub mod intent;
pub mod operations;
pub mod paginator;
pub mod reconcile;
pub mod remote;
pub mod scenario;

pub use classify::*;
pub use config::*;
pub use dispatcher::*;
pub use intent::*;
pub use operations::*;
pub use paginator::*;
pub use remote::*;

#[cfg(test)]
mod scenario_tests {
    use super::scenario::*;
    use practicum_core::{StudentId, VisitLogId, VisitStatus};
    use std::path::Path;

    async fn run(name: &str) -> ScenarioReport {
        let p = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios").join(name);
        let report = simulate(&p).await.unwrap();
        assert!(report.mismatches().is_empty(), "unexpected step results: {:#?}", report.mismatches());
        report
    }

    #[tokio::test]
    async fn test_scenario_sc01_failed_toggle_reverts() {
        let report = run("SC-01-toggle-rollback.yaml").await;
        let s1 = report.students.get(&StudentId::from("S1")).unwrap();
        let s2 = report.students.get(&StudentId::from("S2")).unwrap();
        assert!(s1.active);
        assert!(!s2.active);
        assert!(matches!(report.steps[0].result, StepResult::RolledBack { retryable: true, .. }));
    }

    #[tokio::test]
    async fn test_scenario_sc02_visit_window_and_lifecycle() {
        let report = run("SC-02-visit-window.yaml").await;
        assert_eq!(report.visit_logs.len(), 1);
        let v1 = report.visit_logs.get(&VisitLogId::from("V1")).unwrap();
        assert_eq!(v1.status, VisitStatus::Cancelled);
        assert_eq!(v1.visit_location.as_deref(), Some("Tata Motors, Pune"));
        assert!(matches!(report.steps[4].result, StepResult::RolledBack { retryable: false, .. }));
    }

    #[tokio::test]
    async fn test_scenario_sc03_server_id_replaces_temporary() {
        let report = run("SC-03-create-and-delete.yaml").await;
        let ids: Vec<_> = report.visit_logs.items.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["V2"]);
    }

    #[tokio::test]
    async fn test_scenario_sc04_paging_resets_on_filter_change() {
        let report = run("SC-04-paging.yaml").await;
        assert_eq!(report.steps[1].result, StepResult::Loaded { total: 3, has_more: true });
        assert!(report.students.has_unique_ids());
        assert_eq!(report.students.len(), 1);
        assert!(!report.students.has_more);
        assert!(report.students.error.is_none());
    }
}
