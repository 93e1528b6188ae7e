use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Draft,
    Scheduled,
    Completed,
    Cancelled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Draft => "DRAFT",
            VisitStatus::Scheduled => "SCHEDULED",
            VisitStatus::Completed => "COMPLETED",
            VisitStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(VisitStatus::Draft),
            "SCHEDULED" => Some(VisitStatus::Scheduled),
            "COMPLETED" => Some(VisitStatus::Completed),
            "CANCELLED" | "CANCELED" => Some(VisitStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    Physical,
    Virtual,
    Telephonic,
}

impl VisitType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHYSICAL" => Some(VisitType::Physical),
            "VIRTUAL" => Some(VisitType::Virtual),
            "TELEPHONIC" => Some(VisitType::Telephonic),
            _ => None,
        }
    }
}

/// Where a student is in their internship. This, not the application status
/// string, decides whether a student counts as active.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternshipPhase {
    #[default]
    NotStarted,
    Active,
    Completed,
    Inactive,
}

impl InternshipPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, InternshipPhase::Active)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NOT_STARTED" | "PENDING" => Some(InternshipPhase::NotStarted),
            "ACTIVE" | "ONGOING" | "IN_PROGRESS" => Some(InternshipPhase::Active),
            "COMPLETED" => Some(InternshipPhase::Completed),
            "INACTIVE" | "TERMINATED" => Some(InternshipPhase::Inactive),
            _ => None,
        }
    }
}

/// The named operations the dispatcher runs. Used for logging and for
/// scenario reports.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ToggleStatus,
    DeleteLog,
    CreateLog,
    UpdateLog,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::ToggleStatus => "toggle-status",
            OperationKind::DeleteLog => "delete-log",
            OperationKind::CreateLog => "create-log",
            OperationKind::UpdateLog => "update-log",
        };
        f.write_str(s)
    }
}
