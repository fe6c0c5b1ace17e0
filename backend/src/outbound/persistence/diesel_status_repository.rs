//! PostgreSQL-backed `StatusRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RepositoryError, StatusRepository};
use crate::domain::{NewStatus, ProjectId, Status, StatusId, StatusKind};

use super::diesel_helpers::{collect_rows, invalid_row, map_diesel_error, map_pool_error};
use super::models::{StatusRow, StatusValues};
use super::pool::DbPool;
use super::schema::statuses;

/// Diesel-backed implementation of the `StatusRepository` port.
#[derive(Clone)]
pub struct DieselStatusRepository {
    pool: DbPool,
}

impl DieselStatusRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_status(row: StatusRow) -> Result<Status, RepositoryError> {
    let kind = StatusKind::parse(&row.kind)
        .ok_or_else(|| invalid_row("statuses", format!("unknown kind {}", row.kind)))?;
    Ok(Status {
        id: StatusId::new(row.id),
        project: ProjectId::new(row.project_id),
        kind,
        name: row.name,
        slug: row.slug,
        order: row.sort_order,
        is_closed: row.is_closed,
        color: row.color,
    })
}

#[async_trait]
impl StatusRepository for DieselStatusRepository {
    async fn create(&self, status: NewStatus) -> Result<Status, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let values = StatusValues {
            project_id: status.project.get(),
            kind: status.kind.as_str(),
            name: &status.name,
            slug: &status.slug,
            sort_order: status.order,
            is_closed: status.is_closed,
            color: &status.color,
        };
        let stored: StatusRow = diesel::insert_into(statuses::table)
            .values(&values)
            .returning(StatusRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_status(stored)
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<StatusRow> = statuses::table
            .find(id.get())
            .select(StatusRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_status).transpose()
    }

    async fn list_by_project(
        &self,
        project: ProjectId,
        kind: StatusKind,
    ) -> Result<Vec<Status>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<StatusRow> = statuses::table
            .filter(statuses::project_id.eq(project.get()))
            .filter(statuses::kind.eq(kind.as_str()))
            .select(StatusRow::as_select())
            .order_by((statuses::sort_order, statuses::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_status)
    }

    async fn update(&self, status: &Status) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let values = StatusValues {
            project_id: status.project.get(),
            kind: status.kind.as_str(),
            name: &status.name,
            slug: &status.slug,
            sort_order: status.order,
            is_closed: status.is_closed,
            color: &status.color,
        };
        let updated = diesel::update(statuses::table.find(status.id.get()))
            .set(&values)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!("status {}", status.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(statuses::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("status {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(kind: &str) -> StatusRow {
        StatusRow {
            id: 5,
            project_id: 2,
            kind: kind.to_owned(),
            name: "Done".to_owned(),
            slug: "done".to_owned(),
            sort_order: 5,
            is_closed: true,
            color: "#669900".to_owned(),
        }
    }

    #[rstest]
    #[case("user_story", StatusKind::UserStory)]
    #[case("issue", StatusKind::Issue)]
    fn rows_convert_to_statuses(#[case] kind: &str, #[case] expected: StatusKind) {
        let status = row_to_status(row(kind)).expect("valid row");

        assert_eq!(status.kind, expected);
        assert_eq!(status.order, 5);
        assert!(status.is_closed);
    }

    #[rstest]
    fn unknown_kinds_are_rejected() {
        let error = row_to_status(row("task")).expect_err("unknown kind");

        assert!(matches!(error, RepositoryError::Query { .. }));
    }
}
