//! Roles and memberships, including pending invitations.

use chrono::{DateTime, Utc};

use crate::domain::permissions::ProjectPermission;
use crate::domain::{Email, MembershipId, ProjectId, RoleId, UserId};

/// Role data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub project: ProjectId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub computable: bool,
    pub permissions: Vec<ProjectPermission>,
}

/// Named permission set inside a project. `slug` is unique per project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub project: ProjectId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub computable: bool,
    pub permissions: Vec<ProjectPermission>,
}

impl Role {
    /// Attach a store-assigned id to an unsaved role.
    pub fn from_new(id: RoleId, new_role: NewRole) -> Self {
        let NewRole {
            project,
            name,
            slug,
            order,
            computable,
            permissions,
        } = new_role;
        Self {
            id,
            project,
            name,
            slug,
            order,
            computable,
            permissions,
        }
    }
}

/// Membership data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub project: ProjectId,
    pub user: Option<UserId>,
    pub role: RoleId,
    pub email: Option<Email>,
    pub is_owner: bool,
    pub token: Option<String>,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A user's seat in a project, or an invitation waiting for one.
///
/// ## Invariants
/// - `(project, user)` is unique when `user` is set.
/// - Pending invitations have no `user` and carry a `token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub id: MembershipId,
    pub project: ProjectId,
    pub user: Option<UserId>,
    pub role: RoleId,
    pub email: Option<Email>,
    pub is_owner: bool,
    pub token: Option<String>,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Attach a store-assigned id to an unsaved membership.
    pub fn from_new(id: MembershipId, new_membership: NewMembership) -> Self {
        let NewMembership {
            project,
            user,
            role,
            email,
            is_owner,
            token,
            invited_by,
            created_at,
        } = new_membership;
        Self {
            id,
            project,
            user,
            role,
            email,
            is_owner,
            token,
            invited_by,
            created_at,
        }
    }

    /// `true` while no account has accepted the invitation.
    pub fn is_pending(&self) -> bool {
        self.user.is_none()
    }
}
