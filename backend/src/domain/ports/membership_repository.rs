//! Ports for roles and memberships.
use async_trait::async_trait;

use crate::domain::{
    Membership, MembershipId, NewMembership, NewRole, ProjectId, Role, RoleId, UserId,
};

use super::RepositoryError;

/// Storage for project memberships and pending invitations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert a membership. A second membership of the same user in the same
    /// project is [`RepositoryError::Duplicate`].
    async fn create(&self, membership: NewMembership) -> Result<Membership, RepositoryError>;

    async fn find_by_id(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Membership>, RepositoryError>;

    async fn find_for_user(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> Result<Option<Membership>, RepositoryError>;

    async fn list_by_project(&self, project: ProjectId)
    -> Result<Vec<Membership>, RepositoryError>;

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Membership>, RepositoryError>;

    async fn update(&self, membership: &Membership) -> Result<(), RepositoryError>;

    async fn delete(&self, id: MembershipId) -> Result<(), RepositoryError>;

    /// Move every membership holding `from` to `to`.
    async fn reassign_role(&self, from: RoleId, to: RoleId) -> Result<(), RepositoryError>;
}

/// Storage for project roles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Insert a role. Slug collisions within a project are
    /// [`RepositoryError::Duplicate`].
    async fn create(&self, role: NewRole) -> Result<Role, RepositoryError>;

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;

    /// Roles of a project ordered by `order`, then id.
    async fn list_by_project(&self, project: ProjectId) -> Result<Vec<Role>, RepositoryError>;

    async fn update(&self, role: &Role) -> Result<(), RepositoryError>;

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError>;
}
