//! Port for workflow statuses.
use async_trait::async_trait;

use crate::domain::{NewStatus, ProjectId, Status, StatusId, StatusKind};

use super::RepositoryError;

/// Storage for user-story and issue statuses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn create(&self, status: NewStatus) -> Result<Status, RepositoryError>;

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError>;

    /// Statuses of one kind in a project, ordered by `order`, then id.
    async fn list_by_project(
        &self,
        project: ProjectId,
        kind: StatusKind,
    ) -> Result<Vec<Status>, RepositoryError>;

    async fn update(&self, status: &Status) -> Result<(), RepositoryError>;

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError>;
}
