//! Port for project persistence.
use async_trait::async_trait;

use crate::domain::{NewProject, Project, ProjectId};

use super::RepositoryError;

/// Storage for projects and their reference sequences.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a project. Slug collisions are [`RepositoryError::Duplicate`].
    async fn create(&self, project: NewProject) -> Result<Project, RepositoryError>;

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, RepositoryError>;

    /// Every project, ordered by id.
    async fn list(&self) -> Result<Vec<Project>, RepositoryError>;

    async fn update(&self, project: &Project) -> Result<(), RepositoryError>;

    /// Delete a project together with everything it owns.
    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError>;

    /// Allocate the next reference shared by the project's stories and issues.
    ///
    /// The first call for a project returns 1.
    async fn next_reference(&self, id: ProjectId) -> Result<i64, RepositoryError>;
}
