//! What the core consumes from the transport layer. REST or GraphQL makes no
//! difference here: a remote call is just a future.

use std::future::Future;
use std::time::Duration;

use practicum_core::Cursor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful server answer to a mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Confirmed<T> {
    /// Canonical representation of the target. Replaces the optimistic copy.
    Item(T),
    /// Server confirms the target no longer exists.
    Removed,
    /// Accepted without a body; the optimistic state stands. Commit hands
    /// back the optimistic copy of the target, or `None` if it is no longer
    /// in the collection.
    Accepted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Status(u16),
    Timeout,
    Transport,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Status(code), message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Timeout, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Transport, message: message.into() }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            RemoteErrorKind::Status(c) => Some(c),
            _ => None,
        }
    }
}

/// One page of a cursor-paginated listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest<P> {
    pub params: P,
    /// `None` asks for the first page.
    pub cursor: Option<Cursor>,
    pub limit: u32,
}

pub trait PageFetcher<T, P>: Send + Sync {
    fn fetch(&self, req: PageRequest<P>) -> impl Future<Output = Result<Page<T>, RemoteError>> + Send;
}

impl<T, P, F, Fut> PageFetcher<T, P> for F
where
    F: Fn(PageRequest<P>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>, RemoteError>> + Send,
{
    fn fetch(&self, req: PageRequest<P>) -> impl Future<Output = Result<Page<T>, RemoteError>> + Send {
        self(req)
    }
}

/// Result of a photo or signed-document upload. The URL is stored as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
}

/// The dispatcher never times out on its own; callers wrap remote calls in
/// this so a hung request turns into a (retryable) failure and rolls back.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::timeout(format!("no response within {}ms", limit.as_millis()))),
    }
}
