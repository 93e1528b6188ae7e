//! Visit-log lifecycle and the internship-window date guard.
//!
//! ```text
//! DRAFT ──► SCHEDULED ──► COMPLETED
//!   │           └───────► CANCELLED
//!   ├──────────────────► COMPLETED
//!   └──────────────────► CANCELLED
//! ```
//!
//! The initial status is chosen by the caller: `DRAFT` for "log now, complete
//! later", `COMPLETED` for a log filled in one step.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{error::VisitError, model::*, types::*};

impl VisitStatus {
    pub fn allowed_transitions(&self) -> &'static [VisitStatus] {
        match self {
            VisitStatus::Draft => &[VisitStatus::Scheduled, VisitStatus::Completed, VisitStatus::Cancelled],
            VisitStatus::Scheduled => &[VisitStatus::Completed, VisitStatus::Cancelled],
            VisitStatus::Completed | VisitStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, to: VisitStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// The single date guard. Both the selection-time precheck and the
/// submit-time validation go through here.
///
/// Days are compared, not instants: any time on the start day is fine, and
/// the end day is included in full.
pub fn validate_visit_date(visit_date: NaiveDate, window: &InternshipWindow) -> Result<(), VisitError> {
    if visit_date < window.start_date {
        return Err(VisitError::DateBeforeStart { visit_date, start_date: window.start_date });
    }
    if let Some(end_date) = window.end_date {
        if visit_date > end_date {
            return Err(VisitError::DateAfterEnd { visit_date, end_date });
        }
    }
    Ok(())
}

/// Early warning when the user picks a student (and thereby a window) for a
/// visit date already entered on the form.
pub fn precheck_visit_date(visit_date: NaiveDateTime, window: &InternshipWindow) -> Result<(), VisitError> {
    validate_visit_date(visit_date.date(), window)
}

/// A physical visit needs a location in every status past `DRAFT`.
fn requires_location(log: &VisitLog, status: VisitStatus) -> bool {
    log.visit_type == VisitType::Physical && status != VisitStatus::Draft
}

/// Submit-time check of a log in the status it is about to be saved with.
pub fn validate_submission(log: &VisitLog, window: &InternshipWindow) -> Result<(), VisitError> {
    validate_visit_date(log.visit_day(), window)?;
    if requires_location(log, log.status) && !log.has_location() {
        return Err(VisitError::MissingVisitLocation);
    }
    Ok(())
}

/// Edge check plus the location rule for moving `log` to `to`.
pub fn validate_transition(log: &VisitLog, to: VisitStatus) -> Result<(), VisitError> {
    if !log.status.can_transition_to(to) {
        return Err(VisitError::InvalidTransition { from: log.status, to });
    }
    if requires_location(log, to) && !log.has_location() {
        return Err(VisitError::MissingVisitLocation);
    }
    Ok(())
}

/// Move `log` to `to`, returning the updated copy. The input is untouched on
/// error.
pub fn transition(log: &VisitLog, to: VisitStatus, window: &InternshipWindow) -> Result<VisitLog, VisitError> {
    validate_transition(log, to)?;
    let mut next = log.clone();
    next.status = to;
    validate_submission(&next, window)?;
    Ok(next)
}
