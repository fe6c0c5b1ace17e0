//! Issue use-cases and voting.

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
    Error, HistoryKind, HistoryService, HistoryTarget, Issue, IssueFilter, IssueId, NewIssue,
    Project, ProjectId, Repositories, StatusId, StatusKind, User, VoteTarget,
};

/// Fields of an issue to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateIssue {
    pub project: ProjectId,
    pub subject: String,
    pub description: String,
    pub status: Option<StatusId>,
    pub tags: Vec<String>,
}

/// A partial update. `fields` names the payload keys that were present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueChanges {
    pub version: Option<Value>,
    pub fields: BTreeSet<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<StatusId>,
    pub tags: Option<Vec<String>>,
    pub comment: String,
}

/// An issue with its vote count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueView {
    pub issue: Issue,
    pub votes: usize,
}

/// Issue service.
#[derive(Clone)]
pub struct IssuesService {
    repos: Repositories,
    history: HistoryService,
    clock: Arc<dyn Clock>,
}

impl IssuesService {
    pub fn new(repos: Repositories, history: HistoryService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            history,
            clock,
        }
    }

    async fn load(&self, id: IssueId) -> Result<(Issue, Project), Error> {
        let issue = self
            .repos
            .issues
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Issue not found"))?;
        let project = self.repos.project(issue.project).await?;
        Ok((issue, project))
    }

    async fn authorise(
        &self,
        requester: &Requester,
        project: &Project,
        issue: Option<&Issue>,
        action: &str,
    ) -> Result<(), Error> {
        let access = self.repos.access(requester, project).await?;
        let ctx = PermissionContext::new(requester)
            .with_project(&access)
            .with_object_owner(issue.and_then(|issue| issue.owner));
        rules::issues().check(action, &ctx)
    }

    async fn view(&self, issue: Issue) -> Result<IssueView, Error> {
        let votes = self.repos.votes.count(VoteTarget::Issue(issue.id)).await?;
        Ok(IssueView { issue, votes })
    }

    /// Issues in projects the requester may view, filtered by `filter`.
    pub async fn list(
        &self,
        requester: &Requester,
        filter: &IssueFilter,
    ) -> Result<Vec<IssueView>, Error> {
        let issues = self.repos.issues.list(filter).await?;
        let mut cache = AccessCache::default();
        let mut visible = Vec::with_capacity(issues.len());
        for issue in issues {
            if cache
                .allows(&self.repos, requester, issue.project, ProjectPermission::ViewIssues)
                .await?
            {
                visible.push(self.view(issue).await?);
            }
        }
        Ok(visible)
    }

    /// Fetch one issue with its vote count.
    pub async fn retrieve(&self, requester: &Requester, id: IssueId) -> Result<IssueView, Error> {
        let (issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "retrieve")
            .await?;
        self.view(issue).await
    }

    /// Create an issue in the project's default issue status and record it in history.
    pub async fn create(
        &self,
        requester: &Requester,
        request: CreateIssue,
    ) -> Result<IssueView, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, None, "create").await?;
        let author = authenticated(requester)?;
        let subject = validate_subject(&request.subject)?;

        let (status, is_closed) = match request.status.or(project.default_issue_status) {
            Some(id) => {
                let status = self
                    .repos
                    .project_status(project.id, StatusKind::Issue, id)
                    .await?;
                (Some(status.id), status.is_closed)
            }
            None => (None, false),
        };
        let now = self.clock.utc();
        let reference = self.repos.projects.next_reference(project.id).await?;
        let issue = self
            .repos
            .issues
            .create(NewIssue {
                reference,
                project: project.id,
                owner: Some(author.id),
                status,
                subject,
                description: request.description,
                tags: normalize_tags(request.tags),
                is_closed,
                created_date: now,
            })
            .await?;
        self.snapshot(&issue, HistoryKind::Create, author, "")
            .await?;
        tracing::info!(issue = %issue.id, project = %project.id, "issue created");
        Ok(IssueView { issue, votes: 0 })
    }

    async fn snapshot(
        &self,
        issue: &Issue,
        kind: HistoryKind,
        author: &User,
        comment: &str,
    ) -> Result<(), Error> {
        self.history
            .take_snapshot(Snapshot {
                target: HistoryTarget::Issue(issue.id),
                kind,
                state: issue.snapshot(),
                author,
                comment,
            })
            .await
            .map(|_| ())
    }

    /// Apply a version-checked partial update.
    pub async fn update(
        &self,
        requester: &Requester,
        id: IssueId,
        changes: IssueChanges,
    ) -> Result<IssueView, Error> {
        let (mut issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "update")
            .await?;
        let author = authenticated(requester)?;

        let current = issue.version;
        verify_version(
            &self.repos,
            HistoryTarget::Issue(id),
            changes.version.as_ref(),
            &changes.fields,
            current,
        )
        .await?;

        let now = self.clock.utc();
        if let Some(subject) = changes.subject.as_deref() {
            issue.subject = validate_subject(subject)?;
        }
        if let Some(description) = changes.description {
            issue.description = description;
        }
        if let Some(status_id) = changes.status {
            let status = self
                .repos
                .project_status(project.id, StatusKind::Issue, status_id)
                .await?;
            issue.status = Some(status.id);
            issue.set_closed(status.is_closed, now);
        }
        if let Some(tags) = changes.tags {
            issue.tags = normalize_tags(tags);
        }
        issue.version = current + 1;
        issue.modified_date = now;

        self.repos.issues.update(&issue, current).await?;
        self.snapshot(&issue, HistoryKind::Change, author, &changes.comment)
            .await?;
        self.view(issue).await
    }

    /// Delete an issue after writing its final history entry.
    pub async fn destroy(&self, requester: &Requester, id: IssueId) -> Result<(), Error> {
        let (issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "destroy")
            .await?;
        let author = authenticated(requester)?;
        self.snapshot(&issue, HistoryKind::Delete, author, "")
            .await?;
        self.repos.issues.delete(id).await?;
        Ok(())
    }

    /// Vote for an issue. Voting twice is a no-op.
    pub async fn upvote(&self, requester: &Requester, id: IssueId) -> Result<(), Error> {
        let (issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "upvote")
            .await?;
        let user = authenticated(requester)?;
        self.repos.votes.add(VoteTarget::Issue(id), user.id).await?;
        Ok(())
    }

    /// Withdraw a vote. Withdrawing a missing vote is a no-op.
    pub async fn downvote(&self, requester: &Requester, id: IssueId) -> Result<(), Error> {
        let (issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "downvote")
            .await?;
        let user = authenticated(requester)?;
        self.repos
            .votes
            .remove(VoteTarget::Issue(id), user.id)
            .await?;
        Ok(())
    }

    /// Users who voted for the issue.
    pub async fn voters(&self, requester: &Requester, id: IssueId) -> Result<Vec<User>, Error> {
        let (issue, project) = self.load(id).await?;
        self.authorise(requester, &project, Some(&issue), "voters")
            .await?;
        let ids = self.repos.votes.voters(VoteTarget::Issue(id)).await?;
        Ok(self.repos.users.list_by_ids(&ids).await?)
    }
}

#[cfg(test)]
#[path = "issues_service_tests.rs"]
mod tests;
