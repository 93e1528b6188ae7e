use practicum_core::SyncError;

use crate::remote::{RemoteError, RemoteErrorKind};

/// How a failed remote call should be presented. Stays pure; the dispatcher
/// has already rolled back by the time this is consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeouts, dropped connections, 5xx, 408 and 429. Worth a retry.
    Transient,
    /// The server understood and refused (other 4xx). Retrying won't help.
    Rejected,
}

pub fn classify(err: &RemoteError) -> FailureClass {
    match err.kind {
        RemoteErrorKind::Timeout | RemoteErrorKind::Transport => FailureClass::Transient,
        RemoteErrorKind::Status(408 | 429) => FailureClass::Transient,
        RemoteErrorKind::Status(code) if code >= 500 => FailureClass::Transient,
        RemoteErrorKind::Status(_) => FailureClass::Rejected,
    }
}

pub fn to_sync_error(err: RemoteError) -> SyncError {
    let retryable = classify(&err) == FailureClass::Transient;
    SyncError::Network { status: err.status_code(), message: err.message, retryable }
}
