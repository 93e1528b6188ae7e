use chrono::NaiveDate;
use thiserror::Error;

use crate::model::VisitStatus;

/// Local validation failures. These block a mutation before any optimistic
/// change is applied and never reach the network.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VisitError {
    #[error("visit date {visit_date} is before the internship start {start_date}")]
    DateBeforeStart { visit_date: NaiveDate, start_date: NaiveDate },
    #[error("visit date {visit_date} is after the internship end {end_date}")]
    DateAfterEnd { visit_date: NaiveDate, end_date: NaiveDate },
    #[error("visit log cannot move from {from} to {to}")]
    InvalidTransition { from: VisitStatus, to: VisitStatus },
    #[error("a physical visit needs a location before it can leave DRAFT")]
    MissingVisitLocation,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Remote call rejected. The optimistic change has already been rolled back.
    #[error("remote call failed: {message}")]
    Network {
        message: String,
        status: Option<u16>,
        retryable: bool,
    },
    #[error("a mutation on {target} in {collection} is already in flight")]
    ConcurrentMutation { collection: String, target: String },
    #[error(transparent)]
    Validation(#[from] VisitError),
    #[error("{target} is not present in {collection}")]
    UnknownTarget { collection: String, target: String },
    /// Internal. A page arrived for a filter or load generation that is no
    /// longer current; the paginator discards it instead of surfacing this.
    #[error("stale page for {collection} discarded")]
    StaleCursor { collection: String },
    #[error("filter params could not be serialized: {0}")]
    InvalidFilter(String),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network { retryable: true, .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}
