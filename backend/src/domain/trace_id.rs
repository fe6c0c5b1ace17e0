//! Correlation identifier carried by every request.
//!
//! The HTTP middleware puts one [`TraceId`] in task-local scope per request;
//! [`Error`](crate::domain::Error) picks it up when it is built so clients can
//! quote it back. Task locals do not cross `tokio::spawn`, so background work
//! must be wrapped in [`TraceId::scope`] explicitly.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: TraceId;
}

/// UUID correlating logs, error bodies and the `trace-id` header.
///
/// # Examples
/// ```
/// use tracker_backend::TraceId;
///
/// let id: TraceId = "6f1c9a52-0f0e-4d55-9a44-0d6f1b8b3a10".parse().expect("uuid");
/// assert_eq!(id.to_string(), "6f1c9a52-0f0e-4d55-9a44-0d6f1b8b3a10");
/// assert!(TraceId::current().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Accept a client-supplied header value when it is a UUID.
    pub fn from_header(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    /// Identifier of the request being served, if any.
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    /// Run `fut` with `trace_id` as the current identifier.
    pub async fn scope<Fut>(trace_id: Self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
