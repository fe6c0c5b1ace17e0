//! Membership and invitation use-cases.

use std::sync::Arc;

use mockable::Clock;
use uuid::Uuid;

use crate::domain::permissions::{PermissionContext, ProjectPermission, Requester, rules};
use crate::domain::ports::{Mailer, OutgoingMail};
use crate::domain::repositories::AccessCache;
use crate::domain::user_stories_service::authenticated;
use crate::domain::{
    Email, Error, Membership, MembershipId, NewMembership, Project, ProjectId, Repositories,
    Role, RoleId, User,
};

/// Invite someone, by email, into a project role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMembership {
    pub project: ProjectId,
    pub role: RoleId,
    pub email: String,
}

/// One row of a bulk invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkMembershipEntry {
    pub role: RoleId,
    pub email: String,
}

/// Role or owner flag changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChanges {
    pub role: Option<RoleId>,
    pub is_owner: Option<bool>,
}

/// Membership with the names clients display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipView {
    pub membership: Membership,
    pub role_name: String,
    pub user: Option<User>,
}

/// A pending invitation looked up by token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationView {
    pub membership: Membership,
    pub project_name: String,
    pub project_slug: String,
    pub role_name: String,
    pub invited_by: Option<User>,
}

/// Membership service.
#[derive(Clone)]
pub struct MembershipsService {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl MembershipsService {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            mailer,
            clock,
        }
    }

    async fn load(&self, id: MembershipId) -> Result<(Membership, Project), Error> {
        let membership = self
            .repos
            .memberships
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Membership not found"))?;
        let project = self.repos.project(membership.project).await?;
        Ok((membership, project))
    }

    async fn project_role(&self, project: ProjectId, role: RoleId) -> Result<Role, Error> {
        self.repos
            .roles
            .find_by_id(role)
            .await?
            .filter(|found| found.project == project)
            .ok_or_else(|| Error::invalid_field("role", "invalid_role", "Invalid role for the project"))
    }

    async fn view(&self, membership: Membership) -> Result<MembershipView, Error> {
        let role_name = self
            .repos
            .roles
            .find_by_id(membership.role)
            .await?
            .map(|role| role.name)
            .unwrap_or_default();
        let user = match membership.user {
            Some(id) => self.repos.users.find_by_id(id).await?,
            None => None,
        };
        Ok(MembershipView {
            membership,
            role_name,
            user,
        })
    }

    /// Memberships of visible projects, optionally of one project.
    pub async fn list(
        &self,
        requester: &Requester,
        project: Option<ProjectId>,
    ) -> Result<Vec<MembershipView>, Error> {
        let projects = match project {
            Some(id) => vec![id],
            None => self
                .repos
                .projects
                .list()
                .await?
                .into_iter()
                .map(|project| project.id)
                .collect(),
        };
        let mut cache = AccessCache::default();
        let mut out = Vec::new();
        for id in projects {
            if !cache
                .allows(&self.repos, requester, id, ProjectPermission::ViewProject)
                .await?
            {
                continue;
            }
            for membership in self.repos.memberships.list_by_project(id).await? {
                out.push(self.view(membership).await?);
            }
        }
        Ok(out)
    }

    /// Fetch one membership of a project the requester administers.
    pub async fn retrieve(&self, requester: &Requester, id: MembershipId) -> Result<MembershipView, Error> {
        let (membership, project) = self.load(id).await?;
        self.repos.check_project_value(requester, &project, "retrieve").await?;
        self.view(membership).await
    }

    async fn invite(
        &self,
        inviter: &User,
        project: &Project,
        role: &Role,
        email: &str,
    ) -> Result<Membership, Error> {
        let email = Email::new(email)?;
        let existing_user = self
            .repos
            .users
            .find_by_email(email.as_str())
            .await?
            .filter(|user| user.is_active);
        if let Some(user) = &existing_user
            && self
                .repos
                .memberships
                .find_for_user(project.id, user.id)
                .await?
                .is_some()
        {
            return Err(Error::invalid_field(
                "email",
                "already_member",
                "The user is already member of the project",
            ));
        }
        let duplicate_invite = self
            .repos
            .memberships
            .list_by_project(project.id)
            .await?
            .into_iter()
            .any(|m| m.is_pending() && m.email.as_ref().is_some_and(|e| e.matches(email.as_str())));
        if duplicate_invite {
            return Err(Error::invalid_field(
                "email",
                "already_invited",
                "The user is already invited to the project",
            ));
        }

        let membership = self
            .repos
            .memberships
            .create(NewMembership {
                project: project.id,
                user: existing_user.as_ref().map(|user| user.id),
                role: role.id,
                email: Some(email),
                is_owner: false,
                token: existing_user
                    .is_none()
                    .then(|| Uuid::new_v4().to_string()),
                invited_by: Some(inviter.id),
                created_at: self.clock.utc(),
            })
            .await?;
        self.send_invitation(inviter, project, &membership).await;
        Ok(membership)
    }

    async fn send_invitation(&self, inviter: &User, project: &Project, membership: &Membership) {
        let Some(email) = &membership.email else {
            return;
        };
        let body = match &membership.token {
            Some(token) => format!(
                "{} invited you to join {}. Accept with invitation token {token}.",
                inviter.display_name(),
                project.name
            ),
            None => format!(
                "{} added you to {}.",
                inviter.display_name(),
                project.name
            ),
        };
        let mail = OutgoingMail {
            kind: "membership_invitation",
            to: email.to_string(),
            subject: format!("You have been invited to {}", project.name),
            body,
        };
        if let Err(err) = self.mailer.send(&mail).await {
            tracing::warn!(error = %err, membership = %membership.id, "invitation mail failed");
        }
    }

    /// Add a member or send an invitation; 201 on success.
    pub async fn create(
        &self,
        requester: &Requester,
        request: CreateMembership,
    ) -> Result<MembershipView, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.repos.check_project_value(requester, &project, "create").await?;
        let inviter = authenticated(requester)?;
        let role = self.project_role(project.id, request.role).await?;
        let membership = self.invite(inviter, &project, &role, &request.email).await?;
        self.view(membership).await
    }

    /// Invite several people at once.
    pub async fn bulk_create(
        &self,
        requester: &Requester,
        project: ProjectId,
        entries: Vec<BulkMembershipEntry>,
    ) -> Result<Vec<MembershipView>, Error> {
        let project = self.repos.referenced_project(project).await?;
        self.repos.check_project_value(requester, &project, "bulk_create").await?;
        let inviter = authenticated(requester)?;
        let mut roles = Vec::with_capacity(entries.len());
        for entry in &entries {
            roles.push(self.project_role(project.id, entry.role).await?);
        }
        let mut out = Vec::with_capacity(entries.len());
        for (entry, role) in entries.iter().zip(roles) {
            let membership = self.invite(inviter, &project, &role, &entry.email).await?;
            out.push(self.view(membership).await?);
        }
        Ok(out)
    }

    /// Change a membership's role or owner flag.
    ///
    /// The project owner always stays an owner member.
    pub async fn update(
        &self,
        requester: &Requester,
        id: MembershipId,
        changes: MembershipChanges,
    ) -> Result<MembershipView, Error> {
        let (mut membership, project) = self.load(id).await?;
        self.repos.check_project_value(requester, &project, "partial_update").await?;
        if let Some(role) = changes.role {
            membership.role = self.project_role(project.id, role).await?.id;
        }
        if let Some(is_owner) = changes.is_owner {
            if !is_owner && membership.user == Some(project.owner) {
                return Err(Error::invalid_field(
                    "is_owner",
                    "project_owner",
                    "The project owner must remain an owner member",
                ));
            }
            membership.is_owner = is_owner;
        }
        self.repos.memberships.update(&membership).await?;
        self.view(membership).await
    }

    /// Remove a membership. The project owner's own membership stays.
    pub async fn destroy(&self, requester: &Requester, id: MembershipId) -> Result<(), Error> {
        let (membership, project) = self.load(id).await?;
        self.repos.check_project_value(requester, &project, "destroy").await?;
        if membership.user == Some(project.owner) {
            return Err(Error::invalid_request("The project owner can't be removed"));
        }
        self.repos.memberships.delete(id).await?;
        Ok(())
    }

    /// Mail a pending invitation again.
    pub async fn resend_invitation(&self, requester: &Requester, id: MembershipId) -> Result<(), Error> {
        let (membership, project) = self.load(id).await?;
        self.repos.check_project_value(requester, &project, "resend_invitation").await?;
        let inviter = authenticated(requester)?;
        if !membership.is_pending() {
            return Err(Error::invalid_request("The invitation was already accepted"));
        }
        self.send_invitation(inviter, &project, &membership).await;
        Ok(())
    }

    /// Invitations are only reachable by token, so listing them is refused
    /// to every caller, anonymous ones included.
    ///
    /// The `list` rule denies everyone; the denial is always a 403 rather
    /// than the usual 401 for anonymous callers.
    pub fn list_invitations(&self, requester: &Requester) -> Result<Vec<InvitationView>, Error> {
        let ctx = PermissionContext::new(requester);
        if !rules::invitations().is_allowed("list", &ctx) {
            return Err(Error::forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(Vec::new())
    }

    /// Pending invitation identified by `token`.
    pub async fn invitation(&self, requester: &Requester, token: &str) -> Result<InvitationView, Error> {
        rules::invitations().check("retrieve", &PermissionContext::new(requester))?;
        let membership = self
            .repos
            .memberships
            .find_by_token(token)
            .await?
            .filter(Membership::is_pending)
            .ok_or_else(|| Error::not_found("Invitation not found"))?;
        let project = self.repos.project(membership.project).await?;
        let role_name = self
            .repos
            .roles
            .find_by_id(membership.role)
            .await?
            .map(|role| role.name)
            .unwrap_or_default();
        let invited_by = match membership.invited_by {
            Some(id) => self.repos.users.find_by_id(id).await?,
            None => None,
        };
        Ok(InvitationView {
            membership,
            project_name: project.name,
            project_slug: project.slug,
            role_name,
            invited_by,
        })
    }
}

#[cfg(test)]
#[path = "memberships_service_tests.rs"]
mod tests;
