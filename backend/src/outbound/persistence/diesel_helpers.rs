//! Shared helpers for the Diesel repository implementations.
//!
//! Every adapter reports failures through [`RepositoryError`], so pool and
//! Diesel errors are translated in one place.

use diesel::define_sql_function;
use diesel::sql_types::Text;
use tracing::{debug, warn};

use crate::domain::ProjectPermission;
use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

define_sql_function! {
    /// SQL `lower()`, used for case-insensitive email lookups.
    fn lower(value: Text) -> Text;
}

/// Map pool errors to repository connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors.
///
/// Unique violations become [`RepositoryError::Duplicate`] naming the
/// violated constraint, so callers can tell which key clashed.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> RepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RepositoryError::missing("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => RepositoryError::duplicate(
                info.constraint_name()
                    .map_or_else(|| info.message().to_owned(), str::to_owned),
            ),
            DatabaseErrorKind::ForeignKeyViolation => {
                warn!(
                    message = info.message(),
                    constraint_name = ?info.constraint_name(),
                    "foreign key violation"
                );
                RepositoryError::query("foreign key violation")
            }
            DatabaseErrorKind::ClosedConnection => {
                RepositoryError::connection("database connection error")
            }
            _ => RepositoryError::query("database error"),
        },
        _ => RepositoryError::query("database error"),
    }
}

/// Report a stored row the domain cannot represent.
pub(crate) fn invalid_row(table: &str, detail: impl std::fmt::Display) -> RepositoryError {
    warn!(table, %detail, "stored row failed domain validation");
    RepositoryError::query(format!("invalid {table} row: {detail}"))
}

/// Collect row conversion results, stopping at the first failure.
pub(crate) fn collect_rows<R, T>(
    rows: Vec<R>,
    convert: impl Fn(R) -> Result<T, RepositoryError>,
) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(convert).collect()
}

/// Storage names of `permissions`.
pub(crate) fn permission_names(permissions: &[ProjectPermission]) -> Vec<String> {
    permissions.iter().map(|perm| perm.as_str().to_owned()).collect()
}

/// Parse stored permission names, dropping ones this build does not know.
pub(crate) fn parse_permissions(names: &[String]) -> Vec<ProjectPermission> {
    names
        .iter()
        .filter_map(|name| match name.parse::<ProjectPermission>() {
            Ok(permission) => Some(permission),
            Err(_) => {
                warn!(permission = %name, "ignoring unknown stored permission");
                None
            }
        })
        .collect()
}

/// Raw identifiers for an `eq_any` filter.
pub(crate) fn raw_ids<I: Copy + Into<i64>>(ids: &[I]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_owned()))
    }

    #[rstest]
    fn pool_errors_are_connection_errors() {
        let error = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(error, RepositoryError::Connection { .. }));
        assert!(error.to_string().contains("connection refused"));
    }

    #[rstest]
    #[case(DieselError::NotFound, "record not found")]
    #[case(
        database_error(DatabaseErrorKind::UniqueViolation, "duplicate key value"),
        "duplicate record: duplicate key value"
    )]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection, "server closed"),
        "repository connection failed: database connection error"
    )]
    #[case(
        database_error(DatabaseErrorKind::ForeignKeyViolation, "violates foreign key"),
        "repository query failed: foreign key violation"
    )]
    #[case(DieselError::RollbackTransaction, "repository query failed: database error")]
    fn diesel_errors_map_to_repository_errors(
        #[case] error: DieselError,
        #[case] expected: &str,
    ) {
        assert!(map_diesel_error(error).to_string().contains(expected));
    }

    #[rstest]
    fn unknown_permissions_are_dropped() {
        let names = vec![
            "view_project".to_owned(),
            "launch_rockets".to_owned(),
            "add_issue".to_owned(),
        ];

        assert_eq!(
            parse_permissions(&names),
            [ProjectPermission::ViewProject, ProjectPermission::AddIssue]
        );
    }

    #[rstest]
    fn invalid_rows_are_query_errors() {
        let error = invalid_row("users", "username is empty");

        assert_eq!(
            error,
            RepositoryError::query("invalid users row: username is empty")
        );
    }
}
