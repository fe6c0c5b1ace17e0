//! Task use-cases: the sprint breakdown of user stories.

use std::collections::BTreeSet;
use std::sync::Arc;

use mockable::Clock;
use serde_json::Value;

use crate::domain::history_service::Snapshot;
use crate::domain::permissions::{PermissionContext, ProjectPermission, Requester, rules};
use crate::domain::project::normalize_tags;
use crate::domain::repositories::AccessCache;
use crate::domain::user_stories_service::{authenticated, validate_subject, verify_version};
use crate::domain::{
    Error, HistoryKind, HistoryService, HistoryTarget, MilestoneId, NewTask, Project, ProjectId,
    Repositories, StatusId, StatusKind, Task, TaskFilter, TaskId, User, UserStoryId,
    bulk_subjects,
};

/// Fields of a task to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTask {
    pub project: ProjectId,
    pub subject: String,
    pub description: String,
    pub status: Option<StatusId>,
    pub user_story: Option<UserStoryId>,
    pub milestone: Option<MilestoneId>,
    pub tags: Vec<String>,
    pub is_iocaine: bool,
}

/// A partial update. `fields` names the payload keys that were present, so
/// `user_story` and `milestone` can be cleared with an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub version: Option<Value>,
    pub fields: BTreeSet<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<StatusId>,
    pub user_story: Option<UserStoryId>,
    pub milestone: Option<MilestoneId>,
    pub tags: Option<Vec<String>>,
    pub is_iocaine: Option<bool>,
    pub comment: String,
}

/// Newline separated subjects to create under one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCreateTasks {
    pub project: ProjectId,
    pub milestone: Option<MilestoneId>,
    pub user_story: Option<UserStoryId>,
    pub status: Option<StatusId>,
    pub bulk_tasks: String,
}

/// Task service.
#[derive(Clone)]
pub struct TasksService {
    repos: Repositories,
    history: HistoryService,
    clock: Arc<dyn Clock>,
}

impl TasksService {
    pub fn new(repos: Repositories, history: HistoryService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            history,
            clock,
        }
    }

    async fn load(&self, id: TaskId) -> Result<(Task, Project), Error> {
        let task = self
            .repos
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Task not found"))?;
        let project = self.repos.project(task.project).await?;
        Ok((task, project))
    }

    async fn authorise(
        &self,
        requester: &Requester,
        project: &Project,
        task: Option<&Task>,
        action: &str,
    ) -> Result<(), Error> {
        let access = self.repos.access(requester, project).await?;
        let ctx = PermissionContext::new(requester)
            .with_project(&access)
            .with_object_owner(task.and_then(|task| task.owner));
        rules::tasks().check(action, &ctx)
    }

    async fn snapshot(
        &self,
        task: &Task,
        kind: HistoryKind,
        author: &User,
        comment: &str,
    ) -> Result<(), Error> {
        self.history
            .take_snapshot(Snapshot {
                target: HistoryTarget::Task(task.id),
                kind,
                state: task.snapshot(),
                author,
                comment,
            })
            .await
            .map(|_| ())
    }

    /// Resolve the planning links of a task. A story wins over an explicit
    /// milestone: the task lands in the story's sprint.
    async fn placement(
        &self,
        project: &Project,
        user_story: Option<UserStoryId>,
        milestone: Option<MilestoneId>,
    ) -> Result<(Option<UserStoryId>, Option<MilestoneId>), Error> {
        if let Some(id) = user_story {
            let story = self
                .repos
                .project_user_story(project.id, id, "user_story")
                .await?;
            return Ok((Some(story.id), story.milestone));
        }
        match milestone {
            Some(id) => {
                let milestone = self
                    .repos
                    .project_milestone(project.id, id, "milestone")
                    .await?;
                Ok((None, Some(milestone.id)))
            }
            None => Ok((None, None)),
        }
    }

    /// Tasks in projects where the requester holds `ViewTasks`.
    pub async fn list(&self, requester: &Requester, filter: &TaskFilter) -> Result<Vec<Task>, Error> {
        let tasks = self.repos.tasks.list(filter).await?;
        let mut cache = AccessCache::default();
        let mut visible = Vec::with_capacity(tasks.len());
        for task in tasks {
            if cache
                .allows(&self.repos, requester, task.project, ProjectPermission::ViewTasks)
                .await?
            {
                visible.push(task);
            }
        }
        Ok(visible)
    }

    /// Fetch one task the requester may view.
    pub async fn retrieve(&self, requester: &Requester, id: TaskId) -> Result<Task, Error> {
        let (task, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&task), "retrieve")
            .await?;
        Ok(task)
    }

    async fn insert(
        &self,
        author: &User,
        project: &Project,
        request: CreateTask,
    ) -> Result<Task, Error> {
        let subject = validate_subject(&request.subject)?;
        let (status, is_closed) = match request.status.or(project.default_task_status) {
            Some(id) => {
                let status = self
                    .repos
                    .project_status(project.id, StatusKind::Task, id)
                    .await?;
                (Some(status.id), status.is_closed)
            }
            None => (None, false),
        };
        let (user_story, milestone) = self
            .placement(project, request.user_story, request.milestone)
            .await?;
        let reference = self.repos.projects.next_reference(project.id).await?;
        let task = self
            .repos
            .tasks
            .create(NewTask {
                reference,
                project: project.id,
                owner: Some(author.id),
                status,
                user_story,
                milestone,
                subject,
                description: request.description,
                tags: normalize_tags(request.tags),
                is_iocaine: request.is_iocaine,
                is_closed,
                created_date: self.clock.utc(),
            })
            .await?;
        self.snapshot(&task, HistoryKind::Create, author, "").await?;
        Ok(task)
    }

    /// Create a task and record its first history entry.
    ///
    /// A task on a story takes the story's milestone.
    pub async fn create(&self, requester: &Requester, request: CreateTask) -> Result<Task, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, None, "create").await?;
        let author = authenticated(requester)?;
        let task = self.insert(author, &project, request).await?;
        tracing::info!(task = %task.id, project = %project.id, "task created");
        Ok(task)
    }

    /// Apply a version-checked partial update.
    pub async fn update(
        &self,
        requester: &Requester,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Task, Error> {
        let (mut task, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&task), "update")
            .await?;
        let author = authenticated(requester)?;

        let current = task.version;
        verify_version(
            &self.repos,
            HistoryTarget::Task(id),
            changes.version.as_ref(),
            &changes.fields,
            current,
        )
        .await?;

        let now = self.clock.utc();
        if let Some(subject) = changes.subject.as_deref() {
            task.subject = validate_subject(subject)?;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status_id) = changes.status {
            let status = self
                .repos
                .project_status(project.id, StatusKind::Task, status_id)
                .await?;
            task.status = Some(status.id);
            task.set_closed(status.is_closed, now);
        }
        let moves_story = changes.fields.contains("user_story");
        let moves_milestone = changes.fields.contains("milestone");
        if moves_story || moves_milestone {
            let user_story = if moves_story {
                changes.user_story
            } else {
                task.user_story
            };
            let milestone = if moves_milestone {
                changes.milestone
            } else {
                task.milestone
            };
            (task.user_story, task.milestone) =
                self.placement(&project, user_story, milestone).await?;
        }
        if let Some(tags) = changes.tags {
            task.tags = normalize_tags(tags);
        }
        if let Some(is_iocaine) = changes.is_iocaine {
            task.is_iocaine = is_iocaine;
        }
        task.version = current + 1;
        task.modified_date = now;

        self.repos.tasks.update(&task, current).await?;
        self.snapshot(&task, HistoryKind::Change, author, &changes.comment)
            .await?;
        Ok(task)
    }

    /// Delete a task after writing its final history entry.
    pub async fn destroy(&self, requester: &Requester, id: TaskId) -> Result<(), Error> {
        let (task, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&task), "destroy")
            .await?;
        let author = authenticated(requester)?;
        self.snapshot(&task, HistoryKind::Delete, author, "").await?;
        self.repos.tasks.delete(id).await?;
        Ok(())
    }

    /// Create one task per non-blank line of `bulk_tasks`.
    pub async fn bulk_create(
        &self,
        requester: &Requester,
        request: BulkCreateTasks,
    ) -> Result<Vec<Task>, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, None, "bulk_create")
            .await?;
        let author = authenticated(requester)?;

        let mut created = Vec::new();
        for subject in bulk_subjects(&request.bulk_tasks) {
            let task = self
                .insert(
                    author,
                    &project,
                    CreateTask {
                        project: project.id,
                        subject,
                        status: request.status,
                        user_story: request.user_story,
                        milestone: request.milestone,
                        ..CreateTask::default()
                    },
                )
                .await?;
            created.push(task);
        }
        tracing::info!(project = %project.id, count = created.len(), "tasks bulk created");
        Ok(created)
    }
}

#[cfg(test)]
#[path = "tasks_service_tests.rs"]
mod tests;
