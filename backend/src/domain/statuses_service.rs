//! Statuses of user stories, tasks and issues.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::history_service::Snapshot;
use crate::domain::permissions::{ProjectPermission, Requester};
use crate::domain::repositories::AccessCache;
use crate::domain::user_stories_service::authenticated;
use crate::domain::{
    Error, HistoryKind, HistoryService, HistoryTarget, IssueFilter, NewStatus, Project, ProjectId,
    Repositories, Status, StatusId, StatusKind, TaskFilter, User, UserStoryFilter,
    slug_candidates, slugify,
};

/// Status to add to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStatus {
    pub project: ProjectId,
    pub name: String,
    pub order: Option<i32>,
    pub is_closed: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusChanges {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub is_closed: Option<bool>,
    pub color: Option<String>,
}

const DEFAULT_COLOR: &str = "#999999";

/// Statuses service, shared by every status kind.
#[derive(Clone)]
pub struct StatusesService {
    repos: Repositories,
    history: HistoryService,
    clock: Arc<dyn Clock>,
}

impl StatusesService {
    pub fn new(repos: Repositories, history: HistoryService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            history,
            clock,
        }
    }

    async fn load(&self, kind: StatusKind, id: StatusId) -> Result<(Status, Project), Error> {
        let status = self
            .repos
            .statuses
            .find_by_id(id)
            .await?
            .filter(|status| status.kind == kind)
            .ok_or_else(|| Error::not_found("Status not found"))?;
        let project = self.repos.project(status.project).await?;
        Ok((status, project))
    }

    /// Statuses of one kind, in `order`.
    pub async fn list(
        &self,
        requester: &Requester,
        kind: StatusKind,
        project: Option<ProjectId>,
    ) -> Result<Vec<Status>, Error> {
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
                out.extend(self.repos.statuses.list_by_project(id, kind).await?);
            }
        }
        Ok(out)
    }

    pub async fn retrieve(
        &self,
        requester: &Requester,
        kind: StatusKind,
        id: StatusId,
    ) -> Result<Status, Error> {
        let (status, project) = self.load(kind, id).await?;
        self.repos.check_project_value(requester, &project, "retrieve").await?;
        Ok(status)
    }

    /// Create a status of `kind`, slugged from its name.
    pub async fn create(
        &self,
        requester: &Requester,
        kind: StatusKind,
        request: CreateStatus,
    ) -> Result<Status, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.repos.check_project_value(requester, &project, "create").await?;
        let name = request.name.trim().to_owned();
        if name.is_empty() {
            return Err(Error::invalid_field("name", "required", "This field is required."));
        }
        let existing = self.repos.statuses.list_by_project(project.id, kind).await?;
        let slug = slug_candidates(&slugify(&name))
            .find(|candidate| existing.iter().all(|status| &status.slug != candidate))
            .unwrap_or_default();
        let order = request
            .order
            .unwrap_or_else(|| existing.iter().map(|status| status.order).max().unwrap_or(0) + 1);
        let status = self
            .repos
            .statuses
            .create(NewStatus {
                project: project.id,
                kind,
                name,
                slug,
                order,
                is_closed: request.is_closed,
                color: request.color.unwrap_or_else(|| DEFAULT_COLOR.to_owned()),
            })
            .await?;
        tracing::info!(status = %status.id, kind = %kind, "status created");
        Ok(status)
    }

    /// Partial update. Toggling `is_closed` recomputes the items in it.
    pub async fn update(
        &self,
        requester: &Requester,
        kind: StatusKind,
        id: StatusId,
        changes: StatusChanges,
    ) -> Result<Status, Error> {
        let (mut status, project) = self.load(kind, id).await?;
        self.repos.check_project_value(requester, &project, "partial_update").await?;
        let author = authenticated(requester)?;
        if let Some(name) = changes.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::invalid_field("name", "required", "This field is required."));
            }
            name.clone_into(&mut status.name);
        }
        if let Some(order) = changes.order {
            status.order = order;
        }
        if let Some(color) = changes.color {
            status.color = color;
        }
        let closed_changed = changes
            .is_closed
            .is_some_and(|is_closed| is_closed != status.is_closed);
        if let Some(is_closed) = changes.is_closed {
            status.is_closed = is_closed;
        }
        self.repos.statuses.update(&status).await?;
        if closed_changed {
            self.move_items(&status, &status, author).await?;
        }
        Ok(status)
    }

    /// Put every item in `from` into `to` and align its closed flag with
    /// `to`. Each touched item gets a new version and a history entry by
    /// `author`; items already in line are left alone.
    async fn move_items(&self, from: &Status, to: &Status, author: &User) -> Result<(), Error> {
        let now = self.clock.utc();

        macro_rules! move_items {
            ($repo:ident, $filter:ident, $target:path) => {{
                let filter = $filter {
                    project: Some(from.project),
                    status: Some(from.id),
                    ..$filter::default()
                };
                for mut item in self.repos.$repo.list(&filter).await? {
                    if item.status == Some(to.id) && item.is_closed == to.is_closed {
                        continue;
                    }
                    let expected = item.version;
                    item.status = Some(to.id);
                    item.set_closed(to.is_closed, now);
                    item.version = expected + 1;
                    item.modified_date = now;
                    self.repos.$repo.update(&item, expected).await?;
                    self.history
                        .take_snapshot(Snapshot {
                            target: $target(item.id),
                            kind: HistoryKind::Change,
                            state: item.snapshot(),
                            author,
                            comment: "",
                        })
                        .await?;
                }
            }};
        }

        match from.kind {
            StatusKind::UserStory => {
                move_items!(user_stories, UserStoryFilter, HistoryTarget::UserStory);
            }
            StatusKind::Task => move_items!(tasks, TaskFilter, HistoryTarget::Task),
            StatusKind::Issue => move_items!(issues, IssueFilter, HistoryTarget::Issue),
        }
        Ok(())
    }

    async fn in_use(&self, status: &Status) -> Result<bool, Error> {
        let project = Some(status.project);
        let id = Some(status.id);
        Ok(match status.kind {
            StatusKind::UserStory => !self
                .repos
                .user_stories
                .list(&UserStoryFilter {
                    project,
                    status: id,
                    ..UserStoryFilter::default()
                })
                .await?
                .is_empty(),
            StatusKind::Task => !self
                .repos
                .tasks
                .list(&TaskFilter {
                    project,
                    status: id,
                    ..TaskFilter::default()
                })
                .await?
                .is_empty(),
            StatusKind::Issue => !self
                .repos
                .issues
                .list(&IssueFilter {
                    project,
                    status: id,
                    ..IssueFilter::default()
                })
                .await?
                .is_empty(),
        })
    }

    /// Delete a status, moving its items to `move_to`. A status still in use
    /// or set as the project default needs `move_to`.
    pub async fn destroy(
        &self,
        requester: &Requester,
        kind: StatusKind,
        id: StatusId,
        move_to: Option<StatusId>,
    ) -> Result<(), Error> {
        let (status, mut project) = self.load(kind, id).await?;
        self.repos.check_project_value(requester, &project, "destroy").await?;
        let author = authenticated(requester)?;
        let is_default = project.default_status(kind) == Some(status.id);
        let target = match move_to {
            Some(target) => Some(
                self.repos
                    .statuses
                    .find_by_id(target)
                    .await?
                    .filter(|found| {
                        found.project == project.id && found.kind == kind && found.id != status.id
                    })
                    .ok_or_else(|| {
                        Error::invalid_field(
                            "moveTo",
                            "invalid_status",
                            "Invalid status to move to",
                        )
                    })?,
            ),
            None => None,
        };
        let Some(target) = target else {
            if is_default || self.in_use(&status).await? {
                return Err(Error::invalid_field(
                    "moveTo",
                    "required",
                    "The status is in use; moveTo is required",
                ));
            }
            self.repos.statuses.delete(status.id).await?;
            return Ok(());
        };

        self.move_items(&status, &target, author).await?;
        if is_default {
            project.set_default_status(kind, Some(target.id));
            project.modified_date = self.clock.utc();
            self.repos.projects.update(&project).await?;
        }
        self.repos.statuses.delete(status.id).await?;
        tracing::info!(status = %status.id, moved_to = %target.id, "status deleted");
        Ok(())
    }

    /// Set the `order` of several statuses of `project`; others are ignored.
    pub async fn bulk_update_order(
        &self,
        requester: &Requester,
        kind: StatusKind,
        project: ProjectId,
        orders: &[(StatusId, i32)],
    ) -> Result<(), Error> {
        let project = self.repos.referenced_project(project).await?;
        self.repos
            .check_project_value(requester, &project, "bulk_update_order")
            .await?;
        for mut status in self.repos.statuses.list_by_project(project.id, kind).await? {
            if let Some((_, order)) = orders.iter().find(|(id, _)| *id == status.id) {
                status.order = *order;
                self.repos.statuses.update(&status).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "statuses_service_tests.rs"]
mod tests;
