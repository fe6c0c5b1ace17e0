//! Project roles.

use crate::domain::permissions::{ProjectPermission, Requester};
use crate::domain::repositories::AccessCache;
use crate::domain::{Error, NewRole, ProjectId, Repositories, Role, RoleId, slug_candidates, slugify};

/// Role to add to a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRole {
    pub project: ProjectId,
    pub name: String,
    pub order: Option<i32>,
    pub computable: bool,
    pub permissions: Vec<ProjectPermission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub computable: Option<bool>,
    pub permissions: Option<Vec<ProjectPermission>>,
}

/// Roles service.
#[derive(Clone)]
pub struct RolesService {
    repos: Repositories,
}

fn role_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_field("name", "required", "This field is required."));
    }
    Ok(name.to_owned())
}

impl RolesService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn load(&self, id: RoleId) -> Result<Role, Error> {
        self.repos
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Role not found"))
    }

    /// Roles of the projects the requester may view.
    pub async fn list(
        &self,
        requester: &Requester,
        project: Option<ProjectId>,
    ) -> Result<Vec<Role>, Error> {
        let projects = match project {
            Some(id) => vec![id],
            None => self.repos.projects.list().await?.into_iter().map(|p| p.id).collect(),
        };
        let mut cache = AccessCache::default();
        let mut out = Vec::new();
        for id in projects {
            if cache
                .allows(&self.repos, requester, id, ProjectPermission::ViewProject)
                .await?
            {
                out.extend(self.repos.roles.list_by_project(id).await?);
            }
        }
        Ok(out)
    }

    pub async fn retrieve(&self, requester: &Requester, id: RoleId) -> Result<Role, Error> {
        let role = self.load(id).await?;
        let project = self.repos.project(role.project).await?;
        self.repos.check_project_value(requester, &project, "retrieve").await?;
        Ok(role)
    }

    /// Create a role. Needs `AdminRoles` on its project.
    pub async fn create(&self, requester: &Requester, request: CreateRole) -> Result<Role, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.repos.check_project_value(requester, &project, "create").await?;
        let name = role_name(&request.name)?;
        let existing = self.repos.roles.list_by_project(project.id).await?;
        let slug = slug_candidates(&slugify(&name))
            .find(|candidate| existing.iter().all(|role| &role.slug != candidate))
            .unwrap_or_default();
        let order = request
            .order
            .unwrap_or_else(|| existing.iter().map(|role| role.order).max().unwrap_or(0) + 1);
        let role = self
            .repos
            .roles
            .create(NewRole {
                project: project.id,
                name,
                slug,
                order,
                computable: request.computable,
                permissions: request.permissions,
            })
            .await?;
        tracing::info!(role = %role.id, project = %project.id, "role created");
        Ok(role)
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: RoleId,
        changes: RoleChanges,
    ) -> Result<Role, Error> {
        let mut role = self.load(id).await?;
        let project = self.repos.project(role.project).await?;
        self.repos.check_project_value(requester, &project, "partial_update").await?;
        if let Some(name) = changes.name {
            role.name = role_name(&name)?;
        }
        if let Some(order) = changes.order {
            role.order = order;
        }
        if let Some(computable) = changes.computable {
            role.computable = computable;
        }
        if let Some(permissions) = changes.permissions {
            role.permissions = permissions;
        }
        self.repos.roles.update(&role).await?;
        Ok(role)
    }

    /// Delete a role. Members holding it move to `move_to`, which is
    /// required while any membership uses the role.
    pub async fn destroy(
        &self,
        requester: &Requester,
        id: RoleId,
        move_to: Option<RoleId>,
    ) -> Result<(), Error> {
        let role = self.load(id).await?;
        let project = self.repos.project(role.project).await?;
        self.repos.check_project_value(requester, &project, "destroy").await?;
        let in_use = self
            .repos
            .memberships
            .list_by_project(project.id)
            .await?
            .iter()
            .any(|membership| membership.role == role.id);
        match move_to {
            Some(target) => {
                let target = self
                    .repos
                    .roles
                    .find_by_id(target)
                    .await?
                    .filter(|found| found.project == project.id && found.id != role.id)
                    .ok_or_else(|| {
                        Error::invalid_field("moveTo", "invalid_role", "Invalid role to move to")
                    })?;
                self.repos.memberships.reassign_role(role.id, target.id).await?;
            }
            None if in_use => {
                return Err(Error::invalid_field(
                    "moveTo",
                    "required",
                    "The role is in use; moveTo is required",
                ));
            }
            None => {}
        }
        self.repos.roles.delete(role.id).await?;
        tracing::info!(role = %role.id, project = %project.id, "role deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "roles_service_tests.rs"]
mod tests;
