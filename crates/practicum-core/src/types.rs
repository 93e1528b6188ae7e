use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{ids::*, model::*};

/// Normalized student record. Built once at the collaborator boundary
/// (see `normalize`); the core never looks at raw field shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub internship_phase: InternshipPhase,
    /// Historical application status ("SELECTED", "JOINED", ...). Audit only.
    #[serde(default)]
    pub application_status: Option<String>,
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub internship_phase: Option<InternshipPhase>,
    #[serde(default)]
    pub application_status: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Free-form labelled fields attached to a visit (project details, faculty
/// observations). Optional metadata; never gates a transition.
pub type FieldSet = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitLog {
    pub id: VisitLogId,
    pub application_id: ApplicationId,
    pub visit_date: NaiveDateTime,
    pub status: VisitStatus,
    pub visit_type: VisitType,
    #[serde(default)]
    pub visit_location: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub signed_document_url: Option<String>,
    #[serde(default)]
    pub project_fields: FieldSet,
    #[serde(default)]
    pub observation_fields: FieldSet,
    #[serde(default)]
    pub next_visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub follow_up_required: bool,
}

impl VisitLog {
    /// Calendar day of the visit. The date guard compares days, not instants.
    pub fn visit_day(&self) -> NaiveDate {
        self.visit_date.date()
    }

    pub fn has_location(&self) -> bool {
        self.visit_location.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitLogPatch {
    #[serde(default)]
    pub visit_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: Option<VisitStatus>,
    #[serde(default)]
    pub visit_type: Option<VisitType>,
    #[serde(default)]
    pub visit_location: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Replaces the whole photo list when present.
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    #[serde(default)]
    pub signed_document_url: Option<String>,
    /// Merged key by key into the existing fields.
    #[serde(default)]
    pub project_fields: Option<FieldSet>,
    #[serde(default)]
    pub observation_fields: Option<FieldSet>,
    #[serde(default)]
    pub next_visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub follow_up_required: Option<bool>,
}

/// Active window of the internship an application refers to. Open-ended
/// when `end_date` is absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipWindow {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl InternshipWindow {
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self { start_date, end_date }
    }

    pub fn open_ended(start_date: NaiveDate) -> Self {
        Self { start_date, end_date: None }
    }
}
