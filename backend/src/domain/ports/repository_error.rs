//! Error shared by the repository ports.

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by repository adapters.
    pub enum RepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// A unique constraint rejected the write.
        Duplicate { message: String } => "duplicate record: {message}",
        /// The row to update or delete does not exist.
        Missing { message: String } => "record not found: {message}",
        /// A version-guarded update lost a race.
        VersionMismatch { expected: i32, actual: i32 } =>
            "version mismatch: expected {expected}, found {actual}",
    }
}

impl From<RepositoryError> for Error {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Connection { message } => {
                Self::service_unavailable(format!("repository unavailable: {message}"))
            }
            RepositoryError::Query { message } => {
                Self::internal(format!("repository error: {message}"))
            }
            RepositoryError::Duplicate { message } => Self::invalid_request(message),
            RepositoryError::Missing { message } => Self::not_found(message),
            RepositoryError::VersionMismatch { expected, actual } => {
                Self::conflict("The version doesn't match with the current one").with_details(
                    serde_json::json!({
                        "code": "version_mismatch",
                        "expected": expected,
                        "actual": actual,
                    }),
                )
            }
        }
    }
}
