//! User story use-cases, including bulk creation and board reordering.

use std::collections::BTreeSet;
use std::sync::Arc;

use mockable::Clock;
use serde_json::Value;

use crate::domain::history_service::Snapshot;
use crate::domain::occ::{VersionCheck, check_version, reject_conflicting_fields};
use crate::domain::permissions::{PermissionContext, ProjectPermission, Requester, rules};
use crate::domain::project::normalize_tags;
use crate::domain::repositories::AccessCache;
use crate::domain::{
    Error, HistoryKind, HistoryService, HistoryTarget, IssueId, MilestoneId, NewUserStory,
    OrderField, Project, ProjectId, Repositories, StatusId, StatusKind, TaskFilter, User,
    UserStory, UserStoryFilter, UserStoryId,
};

/// Maximum subject length for stories and issues.
pub const SUBJECT_MAX: usize = 500;

/// Fields of a story to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateUserStory {
    pub project: ProjectId,
    pub subject: String,
    pub description: String,
    pub status: Option<StatusId>,
    pub milestone: Option<MilestoneId>,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub backlog_order: Option<i64>,
    pub sprint_order: Option<i64>,
    pub kanban_order: Option<i64>,
    pub generated_from_issue: Option<IssueId>,
}

/// A partial update. `fields` names the payload keys that were present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStoryChanges {
    pub version: Option<Value>,
    pub fields: BTreeSet<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<StatusId>,
    /// Only applied when `fields` holds `milestone`; `None` then moves the
    /// story back to the backlog.
    pub milestone: Option<MilestoneId>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
    pub backlog_order: Option<i64>,
    pub sprint_order: Option<i64>,
    pub kanban_order: Option<i64>,
    pub comment: String,
}

/// Newline separated subjects to create in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCreateUserStories {
    pub project: ProjectId,
    pub status: Option<StatusId>,
    pub bulk_stories: String,
}

/// Split bulk text into subjects: one per non-blank line, trimmed.
pub fn bulk_subjects(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

pub(crate) fn validate_subject(subject: &str) -> Result<String, Error> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(Error::invalid_field(
            "subject",
            "required",
            "This field is required.",
        ));
    }
    if subject.chars().count() > SUBJECT_MAX {
        return Err(Error::invalid_field(
            "subject",
            "too_long",
            format!("Ensure this field has no more than {SUBJECT_MAX} characters."),
        ));
    }
    Ok(subject.to_owned())
}

/// The signed-in user behind `requester`, else 401.
pub(crate) fn authenticated(requester: &Requester) -> Result<&User, Error> {
    requester
        .as_user()
        .ok_or_else(|| Error::unauthorized("Authentication credentials were not provided."))
}

/// User story service.
#[derive(Clone)]
pub struct UserStoriesService {
    repos: Repositories,
    history: HistoryService,
    clock: Arc<dyn Clock>,
}

impl UserStoriesService {
    /// Build the service over `repos`. Every write is recorded through
    /// `history`.
    pub fn new(repos: Repositories, history: HistoryService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            history,
            clock,
        }
    }

    async fn load(&self, id: UserStoryId) -> Result<UserStory, Error> {
        self.repos
            .user_stories
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User story not found"))
    }

    async fn authorise(
        &self,
        requester: &Requester,
        project: &Project,
        owner: Option<crate::domain::UserId>,
        action: &str,
    ) -> Result<(), Error> {
        let access = self.repos.access(requester, project).await?;
        let ctx = PermissionContext::new(requester)
            .with_project(&access)
            .with_object_owner(owner);
        rules::user_stories().check(action, &ctx)
    }

    /// Stories matching `filter` in projects where the requester may view
    /// stories.
    pub async fn list(
        &self,
        requester: &Requester,
        filter: &UserStoryFilter,
    ) -> Result<Vec<UserStory>, Error> {
        let stories = self.repos.user_stories.list(filter).await?;
        let mut cache = AccessCache::default();
        let mut visible = Vec::with_capacity(stories.len());
        for story in stories {
            if cache
                .allows(&self.repos, requester, story.project, ProjectPermission::ViewUs)
                .await?
            {
                visible.push(story);
            }
        }
        Ok(visible)
    }

    /// Load one story; 404 when missing, 401/403 without `view_us`.
    pub async fn retrieve(&self, requester: &Requester, id: UserStoryId) -> Result<UserStory, Error> {
        let story = self.load(id).await?;
        let project = self.repos.project(story.project).await?;
        self.authorise(requester, &project, story.owner, "retrieve")
            .await?;
        Ok(story)
    }

    /// Fetch a story by its project-scoped reference.
    pub async fn by_ref(
        &self,
        requester: &Requester,
        project: ProjectId,
        reference: i64,
    ) -> Result<UserStory, Error> {
        let story = self
            .repos
            .user_stories
            .find_by_ref(project, reference)
            .await?
            .ok_or_else(|| Error::not_found("User story not found"))?;
        let project = self.repos.project(story.project).await?;
        self.authorise(requester, &project, story.owner, "retrieve")
            .await?;
        Ok(story)
    }

    async fn resolve_status(
        &self,
        project: &Project,
        status: Option<StatusId>,
    ) -> Result<(Option<StatusId>, bool), Error> {
        match status.or(project.default_us_status) {
            Some(id) => {
                let status = self
                    .repos
                    .project_status(project.id, StatusKind::UserStory, id)
                    .await?;
                Ok((Some(status.id), status.is_closed))
            }
            None => Ok((None, false)),
        }
    }

    async fn resolve_milestone(
        &self,
        project: &Project,
        milestone: Option<MilestoneId>,
    ) -> Result<Option<MilestoneId>, Error> {
        match milestone {
            Some(id) => Ok(Some(
                self.repos
                    .project_milestone(project.id, id, "milestone")
                    .await?
                    .id,
            )),
            None => Ok(None),
        }
    }

    async fn insert(
        &self,
        author: &User,
        project: &Project,
        request: CreateUserStory,
    ) -> Result<UserStory, Error> {
        let subject = validate_subject(&request.subject)?;
        let (status, is_closed) = self.resolve_status(project, request.status).await?;
        let milestone = self.resolve_milestone(project, request.milestone).await?;
        let now = self.clock.utc();
        let default_order = now.timestamp_millis();
        let reference = self.repos.projects.next_reference(project.id).await?;
        let story = self
            .repos
            .user_stories
            .create(NewUserStory {
                reference,
                project: project.id,
                owner: Some(author.id),
                status,
                milestone,
                subject,
                description: request.description,
                tags: normalize_tags(request.tags),
                is_archived: request.is_archived,
                is_closed,
                backlog_order: request.backlog_order.unwrap_or(default_order),
                sprint_order: request.sprint_order.unwrap_or(default_order),
                kanban_order: request.kanban_order.unwrap_or(default_order),
                generated_from_issue: request.generated_from_issue,
                created_date: now,
            })
            .await?;
        self.history
            .take_snapshot(Snapshot {
                target: HistoryTarget::UserStory(story.id),
                kind: HistoryKind::Create,
                state: story.snapshot(),
                author,
                comment: "",
            })
            .await?;
        Ok(story)
    }

    /// Create a story; 201 on success.
    pub async fn create(
        &self,
        requester: &Requester,
        request: CreateUserStory,
    ) -> Result<UserStory, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, None, "create").await?;
        let author = authenticated(requester)?;

        let source_issue = match request.generated_from_issue {
            Some(issue_id) => Some(
                self.repos
                    .issues
                    .find_by_id(issue_id)
                    .await?
                    .filter(|issue| issue.project == project.id)
                    .ok_or_else(|| {
                        Error::invalid_field(
                            "generated_from_issue",
                            "invalid_issue",
                            "Invalid issue for the project",
                        )
                    })?,
            ),
            None => None,
        };

        let story = self.insert(author, &project, request).await?;

        if let Some(issue) = source_issue {
            let comment = format!(
                "Generating the user story [US #{} - {}]",
                story.reference, story.subject
            );
            self.history
                .take_snapshot(Snapshot {
                    target: HistoryTarget::Issue(issue.id),
                    kind: HistoryKind::Change,
                    state: issue.snapshot(),
                    author,
                    comment: &comment,
                })
                .await?;
        }
        tracing::info!(story = %story.id, project = %project.id, "user story created");
        Ok(story)
    }

    /// Apply a version-checked partial update.
    pub async fn update(
        &self,
        requester: &Requester,
        id: UserStoryId,
        changes: UserStoryChanges,
    ) -> Result<UserStory, Error> {
        let mut story = self.load(id).await?;
        let project = self.repos.project(story.project).await?;
        self.authorise(requester, &project, story.owner, "update")
            .await?;
        let author = authenticated(requester)?;

        let current = story.version;
        self.check_version(HistoryTarget::UserStory(id), &changes, current)
            .await?;

        let now = self.clock.utc();
        if let Some(subject) = changes.subject.as_deref() {
            story.subject = validate_subject(subject)?;
        }
        if let Some(description) = changes.description {
            story.description = description;
        }
        if let Some(status_id) = changes.status {
            let status = self
                .repos
                .project_status(project.id, StatusKind::UserStory, status_id)
                .await?;
            story.status = Some(status.id);
            story.set_closed(status.is_closed, now);
        }
        let previous_milestone = story.milestone;
        if changes.fields.contains("milestone") {
            story.milestone = self.resolve_milestone(&project, changes.milestone).await?;
        }
        if let Some(tags) = changes.tags {
            story.tags = normalize_tags(tags);
        }
        if let Some(is_archived) = changes.is_archived {
            story.is_archived = is_archived;
        }
        for (field, value) in [
            (OrderField::Backlog, changes.backlog_order),
            (OrderField::Sprint, changes.sprint_order),
            (OrderField::Kanban, changes.kanban_order),
        ] {
            if let Some(value) = value {
                story.set_order(field, value);
            }
        }
        story.version = current + 1;
        story.modified_date = now;

        self.repos.user_stories.update(&story, current).await?;
        self.history
            .take_snapshot(Snapshot {
                target: HistoryTarget::UserStory(story.id),
                kind: HistoryKind::Change,
                state: story.snapshot(),
                author,
                comment: &changes.comment,
            })
            .await?;
        if story.milestone != previous_milestone {
            self.move_tasks(&story, author).await?;
        }
        Ok(story)
    }

    /// Keep the tasks of `story` in the story's milestone.
    async fn move_tasks(&self, story: &UserStory, author: &User) -> Result<(), Error> {
        let filter = TaskFilter {
            project: Some(story.project),
            user_story: Some(story.id),
            ..TaskFilter::default()
        };
        let now = self.clock.utc();
        for mut task in self.repos.tasks.list(&filter).await? {
            let expected = task.version;
            task.milestone = story.milestone;
            task.version += 1;
            task.modified_date = now;
            self.repos.tasks.update(&task, expected).await?;
            self.history
                .take_snapshot(Snapshot {
                    target: HistoryTarget::Task(task.id),
                    kind: HistoryKind::Change,
                    state: task.snapshot(),
                    author,
                    comment: "",
                })
                .await?;
        }
        Ok(())
    }

    async fn check_version(
        &self,
        target: HistoryTarget,
        changes: &UserStoryChanges,
        current: i32,
    ) -> Result<(), Error> {
        verify_version(&self.repos, target, changes.version.as_ref(), &changes.fields, current)
            .await
    }

    /// Delete a story after writing its final history entry. Its tasks stay
    /// in the project, detached from the story.
    pub async fn destroy(&self, requester: &Requester, id: UserStoryId) -> Result<(), Error> {
        let story = self.load(id).await?;
        let project = self.repos.project(story.project).await?;
        self.authorise(requester, &project, story.owner, "destroy")
            .await?;
        let author = authenticated(requester)?;
        self.history
            .take_snapshot(Snapshot {
                target: HistoryTarget::UserStory(story.id),
                kind: HistoryKind::Delete,
                state: story.snapshot(),
                author,
                comment: "",
            })
            .await?;
        self.repos.user_stories.delete(id).await?;
        Ok(())
    }

    /// Create one story per non-blank line of `bulk_stories`.
    pub async fn bulk_create(
        &self,
        requester: &Requester,
        request: BulkCreateUserStories,
    ) -> Result<Vec<UserStory>, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, None, "bulk_create")
            .await?;
        let author = authenticated(requester)?;

        let mut created = Vec::new();
        for subject in bulk_subjects(&request.bulk_stories) {
            let story = self
                .insert(
                    author,
                    &project,
                    CreateUserStory {
                        project: project.id,
                        subject,
                        status: request.status,
                        ..CreateUserStory::default()
                    },
                )
                .await?;
            created.push(story);
        }
        tracing::info!(project = %project.id, count = created.len(), "user stories bulk created");
        Ok(created)
    }

    /// Set one board order for stories of a project. Snapshots are hidden.
    pub async fn bulk_update_order(
        &self,
        requester: &Requester,
        project: ProjectId,
        field: OrderField,
        orders: &[(UserStoryId, i64)],
    ) -> Result<(), Error> {
        let project = self.repos.referenced_project(project).await?;
        self.authorise(requester, &project, None, "bulk_update_order")
            .await?;
        let author = authenticated(requester)?;

        let previous = self
            .repos
            .user_stories
            .update_orders(project.id, field, orders)
            .await?;
        for mut story in previous {
            if let Some((_, order)) = orders.iter().find(|(id, _)| *id == story.id) {
                story.set_order(field, *order);
            }
            self.history
                .take_snapshot(Snapshot {
                    target: HistoryTarget::UserStory(story.id),
                    kind: HistoryKind::Change,
                    state: story.snapshot(),
                    author,
                    comment: "",
                })
                .await?;
        }
        Ok(())
    }
}

/// Shared version check for stories, tasks and issues.
pub(crate) async fn verify_version(
    repos: &Repositories,
    target: HistoryTarget,
    requested: Option<&Value>,
    fields: &BTreeSet<String>,
    current: i32,
) -> Result<(), Error> {
    match check_version(requested, current)? {
        VersionCheck::Current => Ok(()),
        VersionCheck::Stale { requested, behind } => {
            let entries = repos.history.list(&target.key()).await?;
            let recent = entries
                .iter()
                .rev()
                .filter(|entry| entry.kind == HistoryKind::Change)
                .take(behind);
            let modified = crate::domain::history::changed_fields(recent);
            let modifying: BTreeSet<String> = fields
                .iter()
                .filter(|field| field.as_str() != "comment")
                .cloned()
                .collect();
            reject_conflicting_fields(requested, current, &modified, &modifying)
        }
    }
}

#[cfg(test)]
#[path = "user_stories_service_tests.rs"]
mod tests;
