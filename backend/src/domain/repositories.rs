//! Repository bundle shared by the domain services, plus the lookups every
//! service needs before it can authorise a request.

use std::sync::Arc;

use crate::domain::permissions::{PermissionContext, ProjectAccess, Requester, rules};
use crate::domain::ports::{
    FeedbackRepository, HistoryRepository, IssueRepository, MembershipRepository,
    MilestoneRepository, ProjectRepository, RoleRepository, StatusRepository, TaskRepository,
    TemplateRepository, UserRepository, UserStoryRepository, VoteRepository,
};
use crate::domain::{
    Error, Milestone, MilestoneId, Project, ProjectId, Status, StatusId, StatusKind, User, UserId,
    UserStory, UserStoryId,
};

/// Every driven repository port, shared behind `Arc`s.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub milestones: Arc<dyn MilestoneRepository>,
    pub user_stories: Arc<dyn UserStoryRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub templates: Arc<dyn TemplateRepository>,
}

impl Repositories {
    /// Load a project or fail with 404.
    pub(crate) async fn project(&self, id: ProjectId) -> Result<Project, Error> {
        self.projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Project not found"))
    }

    /// Load a project named in a request body; unknown ids are a 400.
    pub(crate) async fn referenced_project(&self, id: ProjectId) -> Result<Project, Error> {
        self.projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::invalid_field("project", "invalid_project", "Invalid project"))
    }

    /// Load a user or fail with 404.
    pub(crate) async fn user(&self, id: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Resolve what `requester` may do in `project`.
    pub(crate) async fn access(
        &self,
        requester: &Requester,
        project: &Project,
    ) -> Result<ProjectAccess, Error> {
        let Some(user_id) = requester.id() else {
            return Ok(ProjectAccess::resolve(requester, project, None));
        };
        let Some(membership) = self.memberships.find_for_user(project.id, user_id).await? else {
            return Ok(ProjectAccess::resolve(requester, project, None));
        };
        let role = self.roles.find_by_id(membership.role).await?;
        Ok(match role {
            Some(role) => ProjectAccess::resolve(requester, project, Some((&membership, &role))),
            None => {
                tracing::warn!(membership = %membership.id, "membership references a missing role");
                ProjectAccess::resolve(requester, project, None)
            }
        })
    }

    /// Load a status of `kind` that belongs to `project`, else 400.
    pub(crate) async fn project_status(
        &self,
        project: ProjectId,
        kind: StatusKind,
        id: StatusId,
    ) -> Result<Status, Error> {
        self.statuses
            .find_by_id(id)
            .await?
            .filter(|status| status.project == project && status.kind == kind)
            .ok_or_else(|| {
                Error::invalid_field("status", "invalid_status", "Invalid status for the project")
            })
    }

    /// Load a milestone that belongs to `project`, else 400 on `field`.
    pub(crate) async fn project_milestone(
        &self,
        project: ProjectId,
        id: MilestoneId,
        field: &str,
    ) -> Result<Milestone, Error> {
        self.milestones
            .find_by_id(id)
            .await?
            .filter(|milestone| milestone.project == project)
            .ok_or_else(|| {
                Error::invalid_field(field, "invalid_milestone", "Invalid milestone for the project")
            })
    }

    /// Load a user story that belongs to `project`, else 400 on `field`.
    pub(crate) async fn project_user_story(
        &self,
        project: ProjectId,
        id: UserStoryId,
        field: &str,
    ) -> Result<UserStory, Error> {
        self.user_stories
            .find_by_id(id)
            .await?
            .filter(|story| story.project == project)
            .ok_or_else(|| {
                Error::invalid_field(field, "invalid_user_story", "Invalid user story for the project")
            })
    }
}

impl Repositories {
    /// Check `action` on a project value (membership, role, status).
    pub(crate) async fn check_project_value(
        &self,
        requester: &Requester,
        project: &Project,
        action: &str,
    ) -> Result<(), Error> {
        let access = self.access(requester, project).await?;
        rules::project_values().check(
            action,
            &PermissionContext::new(requester).with_project(&access),
        )
    }
}

/// Memoised permission lookups for list endpoints spanning many projects.
#[derive(Debug, Default)]
pub(crate) struct AccessCache {
    projects: std::collections::HashMap<ProjectId, Option<ProjectAccess>>,
}

impl AccessCache {
    /// `true` when `requester` holds `permission` in `project`. Missing
    /// projects allow nothing.
    pub(crate) async fn allows(
        &mut self,
        repos: &Repositories,
        requester: &Requester,
        project: ProjectId,
        permission: crate::domain::permissions::ProjectPermission,
    ) -> Result<bool, Error> {
        if !self.projects.contains_key(&project) {
            let access = match repos.projects.find_by_id(project).await? {
                Some(found) => Some(repos.access(requester, &found).await?),
                None => None,
            };
            self.projects.insert(project, access);
        }
        Ok(self
            .projects
            .get(&project)
            .and_then(Option::as_ref)
            .is_some_and(|access| access.has(permission)))
    }
}
