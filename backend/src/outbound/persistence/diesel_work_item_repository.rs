//! PostgreSQL-backed user story, task and issue repositories.
//!
//! All three tables carry a `version` column. Updates only apply while the stored
//! version matches the caller's, so concurrent edits surface as
//! [`RepositoryError::VersionMismatch`] instead of silently overwriting.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{
    IssueRepository, RepositoryError, TaskRepository, UserStoryRepository,
};
use crate::domain::{
    Issue, IssueFilter, IssueId, MilestoneId, NewIssue, NewTask, NewUserStory, OrderField,
    ProjectId, StatusId, Task, TaskFilter, TaskId, UserId, UserStory, UserStoryFilter,
    UserStoryId, VoteTarget,
};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{
    IssueRow, IssueValues, TaskRow, TaskValues, UserStoryRow, UserStoryValues,
};
use super::pool::DbPool;
use super::schema::{issues, tasks, user_stories, votes};

const ISSUE_VOTE_KIND: &str = VoteTarget::Issue(IssueId::new(0)).kind();

/// Diesel-backed implementation of the `UserStoryRepository` port.
#[derive(Clone)]
pub struct DieselUserStoryRepository {
    pool: DbPool,
}

impl DieselUserStoryRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Diesel-backed implementation of the `TaskRepository` port.
#[derive(Clone)]
pub struct DieselTaskRepository {
    pool: DbPool,
}

impl DieselTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Diesel-backed implementation of the `IssueRepository` port.
#[derive(Clone)]
pub struct DieselIssueRepository {
    pool: DbPool,
}

impl DieselIssueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_story(row: UserStoryRow) -> UserStory {
    UserStory {
        id: UserStoryId::new(row.id),
        reference: row.reference,
        project: ProjectId::new(row.project_id),
        owner: row.owner_id.map(UserId::new),
        status: row.status_id.map(StatusId::new),
        milestone: row.milestone_id.map(MilestoneId::new),
        subject: row.subject,
        description: row.description,
        tags: row.tags,
        is_archived: row.is_archived,
        is_closed: row.is_closed,
        backlog_order: row.backlog_order,
        sprint_order: row.sprint_order,
        kanban_order: row.kanban_order,
        version: row.version,
        generated_from_issue: row.generated_from_issue_id.map(IssueId::new),
        created_date: row.created_date,
        modified_date: row.modified_date,
        finish_date: row.finish_date,
    }
}

fn story_values(story: &UserStory) -> UserStoryValues<'_> {
    UserStoryValues {
        reference: story.reference,
        project_id: story.project.get(),
        owner_id: story.owner.map(UserId::get),
        status_id: story.status.map(StatusId::get),
        subject: &story.subject,
        description: &story.description,
        tags: &story.tags,
        is_archived: story.is_archived,
        is_closed: story.is_closed,
        backlog_order: story.backlog_order,
        sprint_order: story.sprint_order,
        kanban_order: story.kanban_order,
        version: story.version,
        generated_from_issue_id: story.generated_from_issue.map(IssueId::get),
        created_date: story.created_date,
        modified_date: story.modified_date,
        finish_date: story.finish_date,
        milestone_id: story.milestone.map(MilestoneId::get),
    }
}

fn row_to_task(row: TaskRow) -> Task {
    Task {
        id: TaskId::new(row.id),
        reference: row.reference,
        project: ProjectId::new(row.project_id),
        owner: row.owner_id.map(UserId::new),
        status: row.status_id.map(StatusId::new),
        user_story: row.user_story_id.map(UserStoryId::new),
        milestone: row.milestone_id.map(MilestoneId::new),
        subject: row.subject,
        description: row.description,
        tags: row.tags,
        is_iocaine: row.is_iocaine,
        is_closed: row.is_closed,
        version: row.version,
        created_date: row.created_date,
        modified_date: row.modified_date,
        finished_date: row.finished_date,
    }
}

fn task_values(task: &Task) -> TaskValues<'_> {
    TaskValues {
        reference: task.reference,
        project_id: task.project.get(),
        owner_id: task.owner.map(UserId::get),
        status_id: task.status.map(StatusId::get),
        user_story_id: task.user_story.map(UserStoryId::get),
        milestone_id: task.milestone.map(MilestoneId::get),
        subject: &task.subject,
        description: &task.description,
        tags: &task.tags,
        is_iocaine: task.is_iocaine,
        is_closed: task.is_closed,
        version: task.version,
        created_date: task.created_date,
        modified_date: task.modified_date,
        finished_date: task.finished_date,
    }
}

fn row_to_issue(row: IssueRow) -> Issue {
    Issue {
        id: IssueId::new(row.id),
        reference: row.reference,
        project: ProjectId::new(row.project_id),
        owner: row.owner_id.map(UserId::new),
        status: row.status_id.map(StatusId::new),
        subject: row.subject,
        description: row.description,
        tags: row.tags,
        is_closed: row.is_closed,
        version: row.version,
        created_date: row.created_date,
        modified_date: row.modified_date,
        finished_date: row.finished_date,
    }
}

fn issue_values(issue: &Issue) -> IssueValues<'_> {
    IssueValues {
        reference: issue.reference,
        project_id: issue.project.get(),
        owner_id: issue.owner.map(UserId::get),
        status_id: issue.status.map(StatusId::get),
        subject: &issue.subject,
        description: &issue.description,
        tags: &issue.tags,
        is_closed: issue.is_closed,
        version: issue.version,
        created_date: issue.created_date,
        modified_date: issue.modified_date,
        finished_date: issue.finished_date,
    }
}

/// Explain why a version-guarded update touched no rows.
fn lost_update(what: &str, expected: i32, actual: Option<i32>) -> RepositoryError {
    match actual {
        Some(actual) => RepositoryError::version_mismatch(expected, actual),
        None => RepositoryError::missing(what.to_owned()),
    }
}

#[async_trait]
impl UserStoryRepository for DieselUserStoryRepository {
    async fn create(&self, story: NewUserStory) -> Result<UserStory, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // `from_new` fixes the initial version and dates.
        let pending = UserStory::from_new(UserStoryId::new(0), story);
        let stored: UserStoryRow = diesel::insert_into(user_stories::table)
            .values(&story_values(&pending))
            .returning(UserStoryRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_story(stored))
    }

    async fn find_by_id(&self, id: UserStoryId) -> Result<Option<UserStory>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserStoryRow> = user_stories::table
            .find(id.get())
            .select(UserStoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_story))
    }

    async fn find_by_ref(
        &self,
        project: ProjectId,
        reference: i64,
    ) -> Result<Option<UserStory>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserStoryRow> = user_stories::table
            .filter(user_stories::project_id.eq(project.get()))
            .filter(user_stories::reference.eq(reference))
            .select(UserStoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_story))
    }

    async fn list(&self, filter: &UserStoryFilter) -> Result<Vec<UserStory>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = user_stories::table
            .select(UserStoryRow::as_select())
            .order((user_stories::backlog_order.asc(), user_stories::id.asc()))
            .into_boxed();

        if let Some(project) = filter.project {
            query = query.filter(user_stories::project_id.eq(project.get()));
        }
        if let Some(status) = filter.status {
            query = query.filter(user_stories::status_id.eq(status.get()));
        }
        if let Some(milestone) = filter.milestone {
            query = query.filter(user_stories::milestone_id.eq(milestone.get()));
        }
        match filter.milestone_is_null {
            Some(true) => query = query.filter(user_stories::milestone_id.is_null()),
            Some(false) => query = query.filter(user_stories::milestone_id.is_not_null()),
            None => {}
        }
        if let Some(is_archived) = filter.is_archived {
            query = query.filter(user_stories::is_archived.eq(is_archived));
        }

        let rows = query
            .load::<UserStoryRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(row_to_story)
            .filter(|story| filter.matches_text(story))
            .collect())
    }

    async fn update(
        &self,
        story: &UserStory,
        expected_version: i32,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            user_stories::table
                .filter(user_stories::id.eq(story.id.get()))
                .filter(user_stories::version.eq(expected_version)),
        )
        .set(&story_values(story))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated > 0 {
            return Ok(());
        }

        let actual: Option<i32> = user_stories::table
            .find(story.id.get())
            .select(user_stories::version)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Err(lost_update(
            &format!("user story {}", story.id),
            expected_version,
            actual,
        ))
    }

    async fn update_orders(
        &self,
        project: ProjectId,
        field: OrderField,
        orders: &[(UserStoryId, i64)],
    ) -> Result<Vec<UserStory>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let orders = orders.to_vec();
        conn.transaction(|conn| {
            async move {
                let mut previous = Vec::with_capacity(orders.len());
                for (id, order) in orders {
                    let row: Option<UserStoryRow> = user_stories::table
                        .filter(user_stories::id.eq(id.get()))
                        .filter(user_stories::project_id.eq(project.get()))
                        .select(UserStoryRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(row) = row else {
                        continue;
                    };

                    let target = user_stories::table.find(id.get());
                    let bump = user_stories::version.eq(user_stories::version + 1);
                    match field {
                        OrderField::Backlog => {
                            diesel::update(target)
                                .set((user_stories::backlog_order.eq(order), bump))
                                .execute(conn)
                                .await?
                        }
                        OrderField::Sprint => {
                            diesel::update(target)
                                .set((user_stories::sprint_order.eq(order), bump))
                                .execute(conn)
                                .await?
                        }
                        OrderField::Kanban => {
                            diesel::update(target)
                                .set((user_stories::kanban_order.eq(order), bump))
                                .execute(conn)
                                .await?
                        }
                    };
                    previous.push(row_to_story(row));
                }
                Ok::<_, diesel::result::Error>(previous)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn delete(&self, id: UserStoryId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(user_stories::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("user story {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for DieselTaskRepository {
    async fn create(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let pending = Task::from_new(TaskId::new(0), task);
        let stored: TaskRow = diesel::insert_into(tasks::table)
            .values(&task_values(&pending))
            .returning(TaskRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_task(stored))
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TaskRow> = tasks::table
            .find(id.get())
            .select(TaskRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_task))
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = tasks::table
            .select(TaskRow::as_select())
            .order((tasks::created_date.asc(), tasks::id.asc()))
            .into_boxed();

        if let Some(project) = filter.project {
            query = query.filter(tasks::project_id.eq(project.get()));
        }
        if let Some(story) = filter.user_story {
            query = query.filter(tasks::user_story_id.eq(story.get()));
        }
        if let Some(milestone) = filter.milestone {
            query = query.filter(tasks::milestone_id.eq(milestone.get()));
        }
        if let Some(status) = filter.status {
            query = query.filter(tasks::status_id.eq(status.get()));
        }

        let rows = query
            .load::<TaskRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(row_to_task)
            .filter(|task| filter.matches_text(task))
            .collect())
    }

    async fn update(&self, task: &Task, expected_version: i32) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            tasks::table
                .filter(tasks::id.eq(task.id.get()))
                .filter(tasks::version.eq(expected_version)),
        )
        .set(&task_values(task))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated > 0 {
            return Ok(());
        }

        let actual: Option<i32> = tasks::table
            .find(task.id.get())
            .select(tasks::version)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Err(lost_update(
            &format!("task {}", task.id),
            expected_version,
            actual,
        ))
    }

    async fn delete(&self, id: TaskId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(tasks::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("task {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueRepository for DieselIssueRepository {
    async fn create(&self, issue: NewIssue) -> Result<Issue, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let pending = Issue::from_new(IssueId::new(0), issue);
        let stored: IssueRow = diesel::insert_into(issues::table)
            .values(&issue_values(&pending))
            .returning(IssueRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_issue(stored))
    }

    async fn find_by_id(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<IssueRow> = issues::table
            .find(id.get())
            .select(IssueRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_issue))
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = issues::table
            .select(IssueRow::as_select())
            .order((issues::created_date.desc(), issues::id.desc()))
            .into_boxed();

        if let Some(project) = filter.project {
            query = query.filter(issues::project_id.eq(project.get()));
        }
        if let Some(status) = filter.status {
            query = query.filter(issues::status_id.eq(status.get()));
        }

        let rows = query
            .load::<IssueRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(row_to_issue)
            .filter(|issue| filter.matches(issue))
            .collect())
    }

    async fn update(&self, issue: &Issue, expected_version: i32) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            issues::table
                .filter(issues::id.eq(issue.id.get()))
                .filter(issues::version.eq(expected_version)),
        )
        .set(&issue_values(issue))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated > 0 {
            return Ok(());
        }

        let actual: Option<i32> = issues::table
            .find(issue.id.get())
            .select(issues::version)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Err(lost_update(
            &format!("issue {}", issue.id),
            expected_version,
            actual,
        ))
    }

    async fn delete(&self, id: IssueId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = conn
            .transaction(|conn| {
                async move {
                    diesel::delete(
                        votes::table.filter(
                            votes::kind
                                .eq(ISSUE_VOTE_KIND)
                                .and(votes::object_id.eq(id.get())),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(issues::table.find(id.get()))
                        .execute(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("issue {id}")));
        }
        Ok(())
    }
}
