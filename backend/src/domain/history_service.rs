//! History use-cases: recording snapshots and moderating comments.

use std::sync::Arc;

use mockable::Clock;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::history::{
    DEFAULT_MAX_PARTIAL_DIFFS, Diff, SnapshotInput, build_entry, last_state,
};
use crate::domain::permissions::{PermissionContext, Requester, rules};
use crate::domain::{
    Error, HistoryEntry, HistoryKind, HistoryTarget, HistoryUser, ProjectId, Repositories,
    StatusId, User,
};

/// Records and serves history entries.
#[derive(Clone)]
pub struct HistoryService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    max_partial_diffs: usize,
}

/// One snapshot to record.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    pub target: HistoryTarget,
    pub kind: HistoryKind,
    pub state: Value,
    pub author: &'a User,
    pub comment: &'a str,
}

impl HistoryService {
    /// Build the service with the default snapshot frequency.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            clock,
            max_partial_diffs: DEFAULT_MAX_PARTIAL_DIFFS,
        }
    }

    /// Store a full snapshot after at most `max` partial entries per key.
    #[must_use]
    pub fn with_max_partial_diffs(mut self, max: usize) -> Self {
        self.max_partial_diffs = max;
        self
    }

    /// Store a change and its diff against the entity's previous state.
    ///
    /// Returns `None` when nothing changed and no comment was given.
    pub async fn take_snapshot(
        &self,
        snapshot: Snapshot<'_>,
    ) -> Result<Option<HistoryEntry>, Error> {
        let key = snapshot.target.key();
        let entries = self.repos.history.list(&key).await?;
        let previous = last_state(&entries, self.max_partial_diffs);
        let Some(mut entry) = build_entry(
            &previous,
            SnapshotInput {
                target: snapshot.target,
                kind: snapshot.kind,
                snapshot: snapshot.state,
                user: HistoryUser::from_user(snapshot.author),
                comment: snapshot.comment.to_owned(),
                now: self.clock.utc(),
            },
        ) else {
            return Ok(None);
        };
        entry.values_diff = self.resolve_values(&entry.diff).await?;
        self.repos.history.append(&entry).await?;
        tracing::debug!(
            key = %entry.key,
            kind = entry.kind.as_str(),
            hidden = entry.is_hidden,
            full = entry.is_snapshot,
            "history entry stored"
        );
        Ok(Some(entry))
    }

    /// Replace status ids with status names for display.
    async fn resolve_values(&self, diff: &Diff) -> Result<Diff, Error> {
        let mut values = diff.clone();
        if let Some(pair) = values.get_mut("status") {
            for value in pair.iter_mut() {
                if let Some(id) = value.as_i64()
                    && let Some(status) = self.repos.statuses.find_by_id(StatusId::new(id)).await?
                {
                    *value = Value::String(status.name);
                }
            }
        }
        Ok(values)
    }

    /// Entries of a story or issue the requester may view, oldest first.
    pub async fn list(
        &self,
        requester: &Requester,
        target: HistoryTarget,
    ) -> Result<Vec<HistoryEntry>, Error> {
        let project = self.target_project(target).await?;
        let project = self.repos.project(project).await?;
        let access = self.repos.access(requester, &project).await?;
        rules::history().check(
            "retrieve",
            &PermissionContext::new(requester).with_project(&access),
        )?;
        Ok(self.repos.history.list(&target.key()).await?)
    }

    /// Hide the comment of entry `id`.
    pub async fn delete_comment(
        &self,
        requester: &Requester,
        target: HistoryTarget,
        id: Uuid,
    ) -> Result<HistoryEntry, Error> {
        let mut entry = self.authorised_entry(requester, target, id, "delete_comment").await?;
        let user = requester
            .as_user()
            .ok_or_else(|| Error::unauthorized("Authentication credentials were not provided."))?;
        entry.delete_comment(HistoryUser::from_user(user), self.clock.utc())?;
        self.repos.history.update(&entry).await?;
        Ok(entry)
    }

    /// Restore the hidden comment of entry `id`.
    pub async fn undelete_comment(
        &self,
        requester: &Requester,
        target: HistoryTarget,
        id: Uuid,
    ) -> Result<HistoryEntry, Error> {
        let mut entry = self
            .authorised_entry(requester, target, id, "undelete_comment")
            .await?;
        entry.undelete_comment()?;
        self.repos.history.update(&entry).await?;
        Ok(entry)
    }

    async fn authorised_entry(
        &self,
        requester: &Requester,
        target: HistoryTarget,
        id: Uuid,
        action: &str,
    ) -> Result<HistoryEntry, Error> {
        let project = self.target_project(target).await?;
        let project = self.repos.project(project).await?;
        let access = self.repos.access(requester, &project).await?;
        let key = target.key();
        let entry = self
            .repos
            .history
            .find(&key, id)
            .await?
            .ok_or_else(|| Error::not_found("History entry not found"))?;
        let deleter = entry
            .delete_comment_user
            .as_ref()
            .and_then(|user| user.pk);
        let ctx = PermissionContext::new(requester)
            .with_project(&access)
            .with_comment_owner(entry.user.pk)
            .with_comment_deleter(deleter);
        rules::history().check(action, &ctx)?;
        Ok(entry)
    }

    async fn target_project(&self, target: HistoryTarget) -> Result<ProjectId, Error> {
        match target {
            HistoryTarget::UserStory(id) => self
                .repos
                .user_stories
                .find_by_id(id)
                .await?
                .map(|story| story.project)
                .ok_or_else(|| Error::not_found("User story not found")),
            HistoryTarget::Task(id) => self
                .repos
                .tasks
                .find_by_id(id)
                .await?
                .map(|task| task.project)
                .ok_or_else(|| Error::not_found("Task not found")),
            HistoryTarget::Issue(id) => self
                .repos
                .issues
                .find_by_id(id)
                .await?
                .map(|issue| issue.project)
                .ok_or_else(|| Error::not_found("Issue not found")),
        }
    }
}

#[cfg(test)]
#[path = "history_service_tests.rs"]
mod tests;
