//! Project use-cases: lifecycle, templates, statistics and stars.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::permissions::{
    PermissionContext, ProjectAccess, ProjectPermission, Requester, rules,
};
use crate::domain::project::{PROJECT_NAME_MAX, normalize_tags, visibility_permissions};
use crate::domain::template::{TemplateDefaults, TemplateHeader};
use crate::domain::user_stories_service::authenticated;
use crate::domain::{
    Error, IssueFilter, IssuesStats, MilestoneFilter, MilestoneProgress, NewMembership,
    NewProject, NewRole, NewStatus, Project, ProjectId, ProjectStats, ProjectTemplate,
    Repositories, StatusCount, StatusKind, User, UserId, UserStoryFilter, VoteTarget,
    slug_candidates, slugify,
};

/// Fields of a project to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub anon_permissions: Option<Vec<ProjectPermission>>,
    pub public_permissions: Option<Vec<ProjectPermission>>,
    pub creation_template: Option<String>,
    pub tags: Vec<String>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
}

/// A partial project update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub anon_permissions: Option<Vec<ProjectPermission>>,
    pub public_permissions: Option<Vec<ProjectPermission>>,
    pub tags: Option<Vec<String>>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub default_us_status: Option<crate::domain::StatusId>,
    pub default_task_status: Option<crate::domain::StatusId>,
    pub default_issue_status: Option<crate::domain::StatusId>,
}

/// Name and description of a template captured from a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTemplate {
    pub template_name: String,
    pub template_description: String,
}

/// A project as seen by one requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDetail {
    pub project: Project,
    pub my_permissions: Vec<ProjectPermission>,
    pub i_am_owner: bool,
    pub stars: usize,
    pub is_starred: bool,
}

/// Project service.
#[derive(Clone)]
pub struct ProjectsService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    default_template: String,
}

fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_field("name", "required", "This field is required."));
    }
    if name.chars().count() > PROJECT_NAME_MAX {
        return Err(Error::invalid_field(
            "name",
            "too_long",
            format!("Ensure this field has no more than {PROJECT_NAME_MAX} characters."),
        ));
    }
    Ok(name.to_owned())
}

impl ProjectsService {
    /// Build the service. `default_template` names the template new projects use when none is given.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, default_template: String) -> Self {
        Self {
            repos,
            clock,
            default_template,
        }
    }

    async fn detail(
        &self,
        requester: &Requester,
        project: Project,
        access: &ProjectAccess,
    ) -> Result<ProjectDetail, Error> {
        let target = VoteTarget::Project(project.id);
        let stars = self.repos.votes.count(target).await?;
        let is_starred = match requester.id() {
            Some(user) => self.repos.votes.voters(target).await?.contains(&user),
            None => false,
        };
        Ok(ProjectDetail {
            my_permissions: access.permissions().iter().copied().collect(),
            i_am_owner: access.is_admin(),
            project,
            stars,
            is_starred,
        })
    }

    /// Load a project and check `action`.
    async fn authorised(
        &self,
        requester: &Requester,
        id: ProjectId,
        action: &str,
    ) -> Result<(Project, ProjectAccess), Error> {
        let project = self.repos.project(id).await?;
        let access = self.repos.access(requester, &project).await?;
        rules::projects().check(action, &PermissionContext::new(requester).with_project(&access))?;
        Ok((project, access))
    }

    /// Load a project that must be visible, then check `action`.
    ///
    /// Invisible projects answer 404 so their existence is not disclosed.
    async fn visible(
        &self,
        requester: &Requester,
        id: ProjectId,
        action: &str,
    ) -> Result<(Project, ProjectAccess), Error> {
        let project = self.repos.project(id).await?;
        let access = self.repos.access(requester, &project).await?;
        if !access.is_visible() {
            return Err(Error::not_found("Project not found"));
        }
        rules::projects().check(action, &PermissionContext::new(requester).with_project(&access))?;
        Ok((project, access))
    }

    /// Visible projects, optionally restricted to those `member` belongs to.
    pub async fn list(
        &self,
        requester: &Requester,
        member: Option<UserId>,
    ) -> Result<Vec<ProjectDetail>, Error> {
        rules::projects().check("list", &PermissionContext::new(requester))?;
        let member_of: Option<Vec<ProjectId>> = match member {
            Some(user) => Some(
                self.repos
                    .memberships
                    .list_by_user(user)
                    .await?
                    .into_iter()
                    .map(|membership| membership.project)
                    .collect(),
            ),
            None => None,
        };
        let mut out = Vec::new();
        for project in self.repos.projects.list().await? {
            if member_of
                .as_ref()
                .is_some_and(|projects| !projects.contains(&project.id))
            {
                continue;
            }
            let access = self.repos.access(requester, &project).await?;
            if access.is_visible() {
                out.push(self.detail(requester, project, &access).await?);
            }
        }
        Ok(out)
    }

    /// Fetch a visible project with the requester's permissions on it.
    pub async fn retrieve(&self, requester: &Requester, id: ProjectId) -> Result<ProjectDetail, Error> {
        let (project, access) = self.authorised(requester, id, "retrieve").await?;
        self.detail(requester, project, &access).await
    }

    /// Like [`Self::retrieve`], looked up by slug.
    pub async fn by_slug(&self, requester: &Requester, slug: &str) -> Result<ProjectDetail, Error> {
        let project = self
            .repos
            .projects
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| Error::not_found("Project not found"))?;
        self.retrieve(requester, project.id).await
    }

    /// Look up a built-in or stored template.
    pub async fn template(&self, slug: &str) -> Result<Option<ProjectTemplate>, Error> {
        if let Some(template) = ProjectTemplate::builtin()
            .into_iter()
            .find(|template| template.slug == slug)
        {
            return Ok(Some(template));
        }
        Ok(self.repos.templates.find_by_slug(slug).await?)
    }

    /// Built-in templates followed by stored ones.
    pub async fn list_templates(&self) -> Result<Vec<ProjectTemplate>, Error> {
        let mut templates = ProjectTemplate::builtin();
        templates.extend(self.repos.templates.list().await?);
        Ok(templates)
    }

    async fn unique_project_slug(&self, base: &str) -> Result<String, Error> {
        for candidate in slug_candidates(base) {
            if self.repos.projects.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(Error::internal("slug candidates exhausted"))
    }

    /// Create a project from a template and make the requester its owner.
    pub async fn create(
        &self,
        requester: &Requester,
        request: CreateProject,
    ) -> Result<ProjectDetail, Error> {
        rules::projects().check("create", &PermissionContext::new(requester))?;
        let owner = authenticated(requester)?;
        let name = validate_name(&request.name)?;
        let template_slug = request
            .creation_template
            .clone()
            .unwrap_or_else(|| self.default_template.clone());
        let template = self.template(&template_slug).await?.ok_or_else(|| {
            Error::invalid_field("creation_template", "invalid_template", "Invalid template")
        })?;

        let slug = self
            .unique_project_slug(&slugify(&format!("{}-{name}", owner.username)))
            .await?;
        let (anon_permissions, public_permissions) = visibility_permissions(
            request.is_private,
            request.anon_permissions,
            request.public_permissions,
        );
        let mut project = self
            .repos
            .projects
            .create(NewProject {
                name,
                slug,
                description: request.description,
                owner: owner.id,
                is_private: request.is_private,
                anon_permissions,
                public_permissions,
                total_story_points: request.total_story_points,
                total_milestones: request.total_milestones,
                creation_template: template.slug.clone(),
                tags: normalize_tags(request.tags),
                created_date: self.clock.utc(),
            })
            .await?;
        self.apply_template(&mut project, &template, owner).await?;
        tracing::info!(project = %project.id, slug = %project.slug, template = %template.slug, "project created");

        let access = self.repos.access(requester, &project).await?;
        self.detail(requester, project, &access).await
    }

    async fn apply_template(
        &self,
        project: &mut Project,
        template: &ProjectTemplate,
        owner: &User,
    ) -> Result<(), Error> {
        for kind in StatusKind::ALL {
            for blueprint in template.statuses(kind) {
                let status = self
                    .repos
                    .statuses
                    .create(NewStatus {
                        project: project.id,
                        kind,
                        name: blueprint.name.clone(),
                        slug: blueprint.slug.clone(),
                        order: blueprint.order,
                        is_closed: blueprint.is_closed,
                        color: blueprint.color.clone(),
                    })
                    .await?;
                if status.slug == template.default_status(kind) {
                    project.set_default_status(kind, Some(status.id));
                }
            }
        }

        let mut owner_role = None;
        for blueprint in &template.roles {
            let role = self
                .repos
                .roles
                .create(NewRole {
                    project: project.id,
                    name: blueprint.name.clone(),
                    slug: blueprint.slug.clone(),
                    order: blueprint.order,
                    computable: blueprint.computable,
                    permissions: blueprint.permissions.clone(),
                })
                .await?;
            if role.slug == template.default_owner_role || owner_role.is_none() {
                owner_role = Some(role.id);
            }
        }

        if let Some(role) = owner_role {
            self.repos
                .memberships
                .create(NewMembership {
                    project: project.id,
                    user: Some(owner.id),
                    role,
                    email: Some(owner.email.clone()),
                    is_owner: true,
                    token: None,
                    invited_by: None,
                    created_at: self.clock.utc(),
                })
                .await?;
        }
        self.repos.projects.update(project).await?;
        Ok(())
    }

    /// Apply a partial update. Only owners may update.
    pub async fn update(
        &self,
        requester: &Requester,
        id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<ProjectDetail, Error> {
        let (mut project, _) = self.authorised(requester, id, "update").await?;
        if let Some(name) = changes.name.as_deref() {
            project.name = validate_name(name)?;
        }
        if let Some(description) = changes.description {
            project.description = description;
        }
        if let Some(tags) = changes.tags {
            project.tags = normalize_tags(tags);
        }
        if let Some(points) = changes.total_story_points {
            project.total_story_points = Some(points);
        }
        if let Some(milestones) = changes.total_milestones {
            project.total_milestones = Some(milestones);
        }
        for (kind, status) in [
            (StatusKind::UserStory, changes.default_us_status),
            (StatusKind::Task, changes.default_task_status),
            (StatusKind::Issue, changes.default_issue_status),
        ] {
            if let Some(status) = status {
                let status = self.repos.project_status(project.id, kind, status).await?;
                project.set_default_status(kind, Some(status.id));
            }
        }

        let was_private = project.is_private;
        let is_private = changes.is_private.unwrap_or(was_private);
        if is_private {
            project.anon_permissions.clear();
            project.public_permissions.clear();
        } else if was_private
            || changes.anon_permissions.is_some()
            || changes.public_permissions.is_some()
        {
            let keep_anon = (!was_private).then(|| project.anon_permissions.clone());
            let keep_public = (!was_private).then(|| project.public_permissions.clone());
            let (anon, public) = visibility_permissions(
                false,
                changes.anon_permissions.or(keep_anon),
                changes.public_permissions.or(keep_public),
            );
            project.anon_permissions = anon;
            project.public_permissions = public;
        }
        project.is_private = is_private;
        project.modified_date = self.clock.utc();

        self.repos.projects.update(&project).await?;
        let access = self.repos.access(requester, &project).await?;
        self.detail(requester, project, &access).await
    }

    /// Delete a project along with everything it owns.
    pub async fn destroy(&self, requester: &Requester, id: ProjectId) -> Result<(), Error> {
        let (project, _) = self.authorised(requester, id, "destroy").await?;
        self.repos.projects.delete(project.id).await?;
        tracing::info!(project = %project.id, "project deleted");
        Ok(())
    }

    /// Points and milestone totals for a project.
    ///
    /// Invisible projects report `NotFound`.
    pub async fn stats(&self, requester: &Requester, id: ProjectId) -> Result<ProjectStats, Error> {
        let (project, _) = self.visible(requester, id, "stats").await?;
        let stories = self
            .repos
            .user_stories
            .list(&UserStoryFilter {
                project: Some(project.id),
                ..UserStoryFilter::default()
            })
            .await?;
        let closed = stories.iter().filter(|story| story.is_closed).count();
        let milestones = self
            .repos
            .milestones
            .list(&MilestoneFilter {
                project: Some(project.id),
                ..MilestoneFilter::default()
            })
            .await?
            .into_iter()
            .rev()
            .map(|milestone| {
                let planned = stories
                    .iter()
                    .filter(|story| story.milestone == Some(milestone.id));
                let (total, done) = planned.fold((0, 0), |(total, done), story| {
                    (total + 1, done + usize::from(story.is_closed))
                });
                MilestoneProgress {
                    id: milestone.id,
                    name: milestone.name,
                    closed: milestone.closed,
                    total_userstories: total,
                    closed_userstories: done,
                }
            })
            .collect();
        Ok(ProjectStats {
            name: project.name,
            total_milestones: project.total_milestones,
            total_points: project.total_story_points,
            total_userstories: stories.len(),
            closed_userstories: closed,
            open_userstories: stories.len() - closed,
            archived_userstories: stories.iter().filter(|story| story.is_archived).count(),
            milestones,
        })
    }

    /// Issue counts grouped by status.
    pub async fn issues_stats(
        &self,
        requester: &Requester,
        id: ProjectId,
    ) -> Result<IssuesStats, Error> {
        let (project, _) = self.visible(requester, id, "issues_stats").await?;
        let issues = self
            .repos
            .issues
            .list(&IssueFilter {
                project: Some(project.id),
                ..IssueFilter::default()
            })
            .await?;
        let statuses = self
            .repos
            .statuses
            .list_by_project(project.id, StatusKind::Issue)
            .await?;
        let closed = issues.iter().filter(|issue| issue.is_closed).count();
        let issues_per_status = statuses
            .into_iter()
            .map(|status| StatusCount {
                count: issues
                    .iter()
                    .filter(|issue| issue.status == Some(status.id))
                    .count(),
                id: status.id,
                name: status.name,
                color: status.color,
            })
            .collect();
        Ok(IssuesStats {
            total_issues: issues.len(),
            opened_issues: issues.len() - closed,
            closed_issues: closed,
            issues_per_status,
        })
    }

    /// Star a visible project. Starring twice is a no-op.
    pub async fn star(&self, requester: &Requester, id: ProjectId) -> Result<(), Error> {
        let (project, _) = self.visible(requester, id, "star").await?;
        let user = authenticated(requester)?;
        self.repos
            .votes
            .add(VoteTarget::Project(project.id), user.id)
            .await?;
        Ok(())
    }

    /// Remove the requester's star, if any.
    pub async fn unstar(&self, requester: &Requester, id: ProjectId) -> Result<(), Error> {
        let (project, _) = self.visible(requester, id, "unstar").await?;
        let user = authenticated(requester)?;
        self.repos
            .votes
            .remove(VoteTarget::Project(project.id), user.id)
            .await?;
        Ok(())
    }

    /// Users who starred the project.
    pub async fn fans(&self, requester: &Requester, id: ProjectId) -> Result<Vec<User>, Error> {
        let (project, _) = self.visible(requester, id, "fans").await?;
        let ids = self
            .repos
            .votes
            .voters(VoteTarget::Project(project.id))
            .await?;
        Ok(self.repos.users.list_by_ids(&ids).await?)
    }

    /// Store a template built from the project's statuses and roles.
    pub async fn create_template(
        &self,
        requester: &Requester,
        id: ProjectId,
        request: CreateTemplate,
    ) -> Result<ProjectTemplate, Error> {
        let (project, _) = self.visible(requester, id, "create_template").await?;
        let name = request.template_name.trim();
        if name.is_empty() {
            return Err(Error::invalid_field(
                "template_name",
                "required",
                "Not valid template name",
            ));
        }
        let description = request.template_description.trim();
        if description.is_empty() {
            return Err(Error::invalid_field(
                "template_description",
                "required",
                "Not valid template description",
            ));
        }

        let existing: Vec<String> = self
            .list_templates()
            .await?
            .into_iter()
            .map(|template| template.slug)
            .collect();
        let base = slugify(name);
        let slug = slug_candidates(&base)
            .find(|candidate| !existing.contains(candidate))
            .unwrap_or_else(|| base.clone());

        let us_statuses = self
            .repos
            .statuses
            .list_by_project(project.id, StatusKind::UserStory)
            .await?;
        let task_statuses = self
            .repos
            .statuses
            .list_by_project(project.id, StatusKind::Task)
            .await?;
        let issue_statuses = self
            .repos
            .statuses
            .list_by_project(project.id, StatusKind::Issue)
            .await?;
        let roles = self.repos.roles.list_by_project(project.id).await?;
        let owner_role = match self
            .repos
            .memberships
            .find_for_user(project.id, project.owner)
            .await?
        {
            Some(membership) => roles.iter().find(|role| role.id == membership.role),
            None => None,
        };
        let slug_of = |status: Option<crate::domain::StatusId>, list: &[crate::domain::Status]| {
            status.and_then(|id| list.iter().find(|s| s.id == id).map(|s| s.slug.clone()))
        };
        let default_us = slug_of(project.default_us_status, &us_statuses);
        let default_task = slug_of(project.default_task_status, &task_statuses);
        let default_issue = slug_of(project.default_issue_status, &issue_statuses);

        let template = ProjectTemplate::from_project_values(
            TemplateHeader {
                slug,
                name: name.to_owned(),
                description: description.to_owned(),
                created_date: self.clock.utc(),
            },
            TemplateDefaults {
                owner_role: owner_role.map(|role| role.slug.as_str()),
                us_status: default_us.as_deref(),
                task_status: default_task.as_deref(),
                issue_status: default_issue.as_deref(),
            },
            &us_statuses,
            &task_statuses,
            &issue_statuses,
            &roles,
        );
        self.repos.templates.create(&template).await?;
        tracing::info!(template = %template.slug, project = %project.id, "project template stored");
        Ok(template)
    }
}

#[cfg(test)]
#[path = "projects_service_tests.rs"]
mod tests;
