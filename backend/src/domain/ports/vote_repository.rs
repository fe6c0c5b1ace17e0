//! Port for project stars and issue votes.
use async_trait::async_trait;

use crate::domain::{ProjectId, UserId, VoteTarget};

use super::RepositoryError;

/// Storage for votes. A user votes at most once per target.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Record a vote; `false` when it already existed.
    async fn add(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError>;

    /// Withdraw a vote; `false` when there was none.
    async fn remove(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError>;

    /// Voters of `target`, in voting order.
    async fn voters(&self, target: VoteTarget) -> Result<Vec<UserId>, RepositoryError>;

    async fn count(&self, target: VoteTarget) -> Result<usize, RepositoryError>;

    /// Projects starred by `user`.
    async fn starred_projects(&self, user: UserId) -> Result<Vec<ProjectId>, RepositoryError>;
}
