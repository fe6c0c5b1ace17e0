//! Ports for user stories, tasks and issues.
use async_trait::async_trait;

use crate::domain::{
    Issue, IssueFilter, IssueId, NewIssue, NewTask, NewUserStory, OrderField, ProjectId, Task,
    TaskFilter, TaskId, UserStory, UserStoryFilter, UserStoryId,
};

use super::RepositoryError;

/// Storage for user stories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStoryRepository: Send + Sync {
    async fn create(&self, story: NewUserStory) -> Result<UserStory, RepositoryError>;

    async fn find_by_id(&self, id: UserStoryId) -> Result<Option<UserStory>, RepositoryError>;

    async fn find_by_ref(
        &self,
        project: ProjectId,
        reference: i64,
    ) -> Result<Option<UserStory>, RepositoryError>;

    /// Stories matching `filter`, ordered by backlog order, then id.
    async fn list(&self, filter: &UserStoryFilter) -> Result<Vec<UserStory>, RepositoryError>;

    /// Store `story` if the stored version still equals `expected_version`.
    ///
    /// A lost race is [`RepositoryError::VersionMismatch`].
    async fn update(&self, story: &UserStory, expected_version: i32)
    -> Result<(), RepositoryError>;

    /// Set one order field for stories of `project` and bump their versions;
    /// ids outside the project are ignored. Returns the stories as they were
    /// before the change.
    async fn update_orders(
        &self,
        project: ProjectId,
        field: OrderField,
        orders: &[(UserStoryId, i64)],
    ) -> Result<Vec<UserStory>, RepositoryError>;

    /// Delete a story; its tasks stay in the project without a story.
    async fn delete(&self, id: UserStoryId) -> Result<(), RepositoryError>;
}

/// Storage for tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: NewTask) -> Result<Task, RepositoryError>;

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Tasks matching `filter`, oldest first.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError>;

    /// Version-guarded overwrite, as [`UserStoryRepository::update`].
    async fn update(&self, task: &Task, expected_version: i32) -> Result<(), RepositoryError>;

    async fn delete(&self, id: TaskId) -> Result<(), RepositoryError>;
}

/// Storage for issues.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn create(&self, issue: NewIssue) -> Result<Issue, RepositoryError>;

    async fn find_by_id(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError>;

    /// Issues matching `filter`, newest first.
    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RepositoryError>;

    /// Version-guarded overwrite, as [`UserStoryRepository::update`].
    async fn update(&self, issue: &Issue, expected_version: i32) -> Result<(), RepositoryError>;

    /// Delete an issue together with its votes.
    async fn delete(&self, id: IssueId) -> Result<(), RepositoryError>;
}
