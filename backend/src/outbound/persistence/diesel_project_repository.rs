//! PostgreSQL-backed `ProjectRepository` implementation using Diesel ORM.
//!
//! Roles, memberships, statuses, milestones and work items go with their
//! project through `ON DELETE CASCADE`. Votes and history entries are keyed by
//! strings rather than foreign keys, so `delete` removes them in the same
//! transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{ProjectRepository, RepositoryError};
use crate::domain::{
    HistoryTarget, IssueId, NewProject, Project, ProjectId, StatusId, TaskId, UserId,
    UserStoryId, VoteTarget,
};

use super::diesel_helpers::{
    collect_rows, map_diesel_error, map_pool_error, parse_permissions, permission_names,
};
use super::models::{NewProjectRow, ProjectChangeset, ProjectRow};
use super::pool::DbPool;
use super::schema::{history_entries, issues, projects, tasks, user_stories, votes};

const ISSUE_VOTE_KIND: &str = VoteTarget::Issue(IssueId::new(0)).kind();

/// Diesel-backed implementation of the `ProjectRepository` port.
#[derive(Clone)]
pub struct DieselProjectRepository {
    pool: DbPool,
}

impl DieselProjectRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_project(row: ProjectRow) -> Result<Project, RepositoryError> {
    Ok(Project {
        id: ProjectId::new(row.id),
        name: row.name,
        slug: row.slug,
        description: row.description,
        owner: UserId::new(row.owner_id),
        created_date: row.created_date,
        modified_date: row.modified_date,
        is_private: row.is_private,
        anon_permissions: parse_permissions(&row.anon_permissions),
        public_permissions: parse_permissions(&row.public_permissions),
        default_us_status: row.default_us_status_id.map(StatusId::new),
        default_issue_status: row.default_issue_status_id.map(StatusId::new),
        default_task_status: row.default_task_status_id.map(StatusId::new),
        total_story_points: row.total_story_points,
        total_milestones: row.total_milestones,
        creation_template: row.creation_template,
        tags: row.tags,
    })
}

#[async_trait]
impl ProjectRepository for DieselProjectRepository {
    async fn create(&self, project: NewProject) -> Result<Project, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewProjectRow {
            name: &project.name,
            slug: &project.slug,
            description: &project.description,
            owner_id: project.owner.get(),
            created_date: project.created_date,
            modified_date: project.created_date,
            is_private: project.is_private,
            anon_permissions: permission_names(&project.anon_permissions),
            public_permissions: permission_names(&project.public_permissions),
            total_story_points: project.total_story_points,
            total_milestones: project.total_milestones,
            creation_template: &project.creation_template,
            tags: &project.tags,
        };
        let stored: ProjectRow = diesel::insert_into(projects::table)
            .values(&row)
            .returning(ProjectRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_project(stored)
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProjectRow> = projects::table
            .find(id.get())
            .select(ProjectRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_project).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProjectRow> = projects::table
            .filter(projects::slug.eq(slug))
            .select(ProjectRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_project).transpose()
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ProjectRow> = projects::table
            .select(ProjectRow::as_select())
            .order_by(projects::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_project)
    }

    async fn update(&self, project: &Project) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = ProjectChangeset {
            name: &project.name,
            slug: &project.slug,
            description: &project.description,
            owner_id: project.owner.get(),
            modified_date: project.modified_date,
            is_private: project.is_private,
            anon_permissions: permission_names(&project.anon_permissions),
            public_permissions: permission_names(&project.public_permissions),
            default_us_status_id: project.default_us_status.map(StatusId::get),
            default_issue_status_id: project.default_issue_status.map(StatusId::get),
            default_task_status_id: project.default_task_status.map(StatusId::get),
            total_story_points: project.total_story_points,
            total_milestones: project.total_milestones,
            creation_template: &project.creation_template,
            tags: &project.tags,
        };
        let updated = diesel::update(projects::table.find(project.id.get()))
            .set(&changeset)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!("project {}", project.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = conn
            .transaction(|conn| {
                async move {
                    let story_ids: Vec<i64> = user_stories::table
                        .filter(user_stories::project_id.eq(id.get()))
                        .select(user_stories::id)
                        .load(conn)
                        .await?;
                    let task_ids: Vec<i64> = tasks::table
                        .filter(tasks::project_id.eq(id.get()))
                        .select(tasks::id)
                        .load(conn)
                        .await?;
                    let issue_ids: Vec<i64> = issues::table
                        .filter(issues::project_id.eq(id.get()))
                        .select(issues::id)
                        .load(conn)
                        .await?;

                    let history_keys: Vec<String> = story_ids
                        .iter()
                        .map(|story| HistoryTarget::UserStory(UserStoryId::new(*story)).key())
                        .chain(
                            task_ids
                                .iter()
                                .map(|task| HistoryTarget::Task(TaskId::new(*task)).key()),
                        )
                        .chain(
                            issue_ids
                                .iter()
                                .map(|issue| HistoryTarget::Issue(IssueId::new(*issue)).key()),
                        )
                        .collect();
                    diesel::delete(
                        history_entries::table.filter(history_entries::key.eq_any(history_keys)),
                    )
                    .execute(conn)
                    .await?;

                    diesel::delete(
                        votes::table.filter(
                            votes::kind
                                .eq(VoteTarget::Project(id).kind())
                                .and(votes::object_id.eq(id.get())),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    if !issue_ids.is_empty() {
                        diesel::delete(
                            votes::table.filter(
                                votes::kind
                                    .eq(ISSUE_VOTE_KIND)
                                    .and(votes::object_id.eq_any(issue_ids)),
                            ),
                        )
                        .execute(conn)
                        .await?;
                    }

                    diesel::delete(projects::table.find(id.get()))
                        .execute(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("project {id}")));
        }
        Ok(())
    }

    async fn next_reference(&self, id: ProjectId) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(projects::table.find(id.get()))
            .set(projects::last_ref.eq(projects::last_ref + 1))
            .returning(projects::last_ref)
            .get_result::<i64>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .ok_or_else(|| RepositoryError::missing(format!("project {id}")))
    }
}
