//! Agile project tracker backend.
//!
//! Hexagonal layout: [`domain`] holds entities, permissions and use-case
//! services; [`inbound`] adapts HTTP requests onto them; [`outbound`] provides
//! PostgreSQL and in-memory repositories plus the mailer.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::{TRACE_ID_HEADER, TraceId};
pub use middleware::Trace;
