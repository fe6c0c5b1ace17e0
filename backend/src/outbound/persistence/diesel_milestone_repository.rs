//! PostgreSQL-backed `MilestoneRepository` implementation using Diesel ORM.
//!
//! Stories and tasks reference milestones with `ON DELETE SET NULL`, so a
//! deleted milestone sends them back to the backlog without extra queries.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MilestoneRepository, RepositoryError};
use crate::domain::{Milestone, MilestoneFilter, MilestoneId, NewMilestone, ProjectId, UserId};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{MilestoneRow, MilestoneValues};
use super::pool::DbPool;
use super::schema::milestones;

/// Diesel-backed implementation of the `MilestoneRepository` port.
#[derive(Clone)]
pub struct DieselMilestoneRepository {
    pool: DbPool,
}

impl DieselMilestoneRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_milestone(row: MilestoneRow) -> Milestone {
    Milestone {
        id: MilestoneId::new(row.id),
        project: ProjectId::new(row.project_id),
        owner: row.owner_id.map(UserId::new),
        name: row.name,
        slug: row.slug,
        estimated_start: row.estimated_start,
        estimated_finish: row.estimated_finish,
        closed: row.closed,
        disponibility: row.disponibility,
        order: row.sort_order,
        created_date: row.created_date,
        modified_date: row.modified_date,
    }
}

fn milestone_values(milestone: &Milestone) -> MilestoneValues<'_> {
    MilestoneValues {
        project_id: milestone.project.get(),
        owner_id: milestone.owner.map(UserId::get),
        name: &milestone.name,
        slug: &milestone.slug,
        estimated_start: milestone.estimated_start,
        estimated_finish: milestone.estimated_finish,
        closed: milestone.closed,
        disponibility: milestone.disponibility,
        sort_order: milestone.order,
        created_date: milestone.created_date,
        modified_date: milestone.modified_date,
    }
}

#[async_trait]
impl MilestoneRepository for DieselMilestoneRepository {
    async fn create(&self, milestone: NewMilestone) -> Result<Milestone, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let pending = Milestone::from_new(MilestoneId::new(0), milestone);
        let stored: MilestoneRow = diesel::insert_into(milestones::table)
            .values(&milestone_values(&pending))
            .returning(MilestoneRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_milestone(stored))
    }

    async fn find_by_id(&self, id: MilestoneId) -> Result<Option<Milestone>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MilestoneRow> = milestones::table
            .find(id.get())
            .select(MilestoneRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_milestone))
    }

    async fn list(&self, filter: &MilestoneFilter) -> Result<Vec<Milestone>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = milestones::table
            .select(MilestoneRow::as_select())
            .order((milestones::estimated_start.desc(), milestones::id.desc()))
            .into_boxed();
        if let Some(project) = filter.project {
            query = query.filter(milestones::project_id.eq(project.get()));
        }
        if let Some(closed) = filter.closed {
            query = query.filter(milestones::closed.eq(closed));
        }
        let rows = query
            .load::<MilestoneRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_milestone).collect())
    }

    async fn update(&self, milestone: &Milestone) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(milestones::table.find(milestone.id.get()))
            .set(&milestone_values(milestone))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!("milestone {}", milestone.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: MilestoneId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(milestones::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("milestone {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rstest::rstest;

    #[rstest]
    fn rows_convert_to_milestones_and_back() {
        let now = Utc::now();
        let row = MilestoneRow {
            id: 4,
            project_id: 2,
            owner_id: None,
            name: "Sprint 1".to_owned(),
            slug: "sprint-1".to_owned(),
            estimated_start: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
            estimated_finish: NaiveDate::from_ymd_opt(2024, 5, 14).expect("date"),
            closed: true,
            disponibility: 12.5,
            sort_order: 3,
            created_date: now,
            modified_date: now,
        };

        let milestone = row_to_milestone(row);

        assert_eq!(milestone.id, MilestoneId::new(4));
        assert_eq!(milestone.owner, None);
        assert_eq!(milestone.order, 3);
        assert!(milestone.closed);
        let values = milestone_values(&milestone);
        assert_eq!(values.sort_order, 3);
        assert_eq!(values.slug, "sprint-1");
        assert!((values.disponibility - 12.5).abs() < f64::EPSILON);
    }
}
