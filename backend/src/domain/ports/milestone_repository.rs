//! Port for milestones.
use async_trait::async_trait;

use crate::domain::{Milestone, MilestoneFilter, MilestoneId, NewMilestone};

use super::RepositoryError;

/// Storage for project milestones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MilestoneRepository: Send + Sync {
    /// Insert a milestone. A name or slug already used in the project is
    /// [`RepositoryError::Duplicate`].
    async fn create(&self, milestone: NewMilestone) -> Result<Milestone, RepositoryError>;

    async fn find_by_id(&self, id: MilestoneId) -> Result<Option<Milestone>, RepositoryError>;

    /// Milestones matching `filter`, latest estimated start first.
    async fn list(&self, filter: &MilestoneFilter) -> Result<Vec<Milestone>, RepositoryError>;

    async fn update(&self, milestone: &Milestone) -> Result<(), RepositoryError>;

    /// Delete a milestone; its stories and tasks go back to the backlog.
    async fn delete(&self, id: MilestoneId) -> Result<(), RepositoryError>;
}
