//! Tasks: the units of work a user story is split into during a sprint.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::domain::user_story::matches_text;
use crate::domain::{MilestoneId, ProjectId, StatusId, TaskId, UserId, UserStoryId};

/// Task data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub user_story: Option<UserStoryId>,
    pub milestone: Option<MilestoneId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_iocaine: bool,
    pub is_closed: bool,
    pub created_date: DateTime<Utc>,
}

/// A stored task.
///
/// ## Invariants
/// - `reference` comes from the project sequence shared with stories and
///   issues.
/// - A task with a user story sits in that story's milestone.
/// - `is_closed` mirrors the status; `finished_date` is set exactly while
///   closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub user_story: Option<UserStoryId>,
    pub milestone: Option<MilestoneId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_iocaine: bool,
    pub is_closed: bool,
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Attach a store-assigned id to an unsaved task.
    pub fn from_new(id: TaskId, new_task: NewTask) -> Self {
        let NewTask {
            reference,
            project,
            owner,
            status,
            user_story,
            milestone,
            subject,
            description,
            tags,
            is_iocaine,
            is_closed,
            created_date,
        } = new_task;
        Self {
            id,
            reference,
            project,
            owner,
            status,
            user_story,
            milestone,
            subject,
            description,
            tags,
            is_iocaine,
            is_closed,
            version: 1,
            created_date,
            modified_date: created_date,
            finished_date: is_closed.then_some(created_date),
        }
    }

    /// Follow the closed flag of the task's status.
    pub fn set_closed(&mut self, is_closed: bool, now: DateTime<Utc>) {
        if is_closed && !self.is_closed {
            self.finished_date = Some(now);
        } else if !is_closed {
            self.finished_date = None;
        }
        self.is_closed = is_closed;
    }

    /// Frozen view recorded in history.
    pub fn snapshot(&self) -> Value {
        json!({
            "ref": self.reference,
            "owner": self.owner,
            "status": self.status,
            "user_story": self.user_story,
            "milestone": self.milestone,
            "subject": self.subject,
            "description": self.description,
            "tags": self.tags,
            "is_iocaine": self.is_iocaine,
            "is_closed": self.is_closed,
            "finished_date": self.finished_date,
        })
    }
}

/// Filters accepted by the task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project: Option<ProjectId>,
    pub user_story: Option<UserStoryId>,
    pub milestone: Option<MilestoneId>,
    pub status: Option<StatusId>,
    pub q: Option<String>,
}

impl TaskFilter {
    /// Filters adapters can push into storage.
    pub fn matches_columns(&self, task: &Task) -> bool {
        self.project.is_none_or(|project| task.project == project)
            && self
                .user_story
                .is_none_or(|story| task.user_story == Some(story))
            && self
                .milestone
                .is_none_or(|milestone| task.milestone == Some(milestone))
            && self.status.is_none_or(|status| task.status == Some(status))
    }

    /// Apply the free-text `q` filter.
    pub fn matches_text(&self, task: &Task) -> bool {
        self.q
            .as_deref()
            .is_none_or(|q| matches_text(task.reference, &task.subject, q))
    }

    /// Whether `task` passes every filter.
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_columns(task) && self.matches_text(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn task() -> Task {
        Task::from_new(
            TaskId::new(4),
            NewTask {
                reference: 12,
                project: ProjectId::new(1),
                owner: Some(UserId::new(2)),
                status: Some(StatusId::new(3)),
                user_story: Some(UserStoryId::new(5)),
                milestone: Some(MilestoneId::new(6)),
                subject: "Write login form".to_owned(),
                description: String::new(),
                tags: Vec::new(),
                is_iocaine: false,
                is_closed: false,
                created_date: Utc::now(),
            },
        )
    }

    #[rstest]
    fn closing_sets_and_reopening_clears_the_finish_date(mut task: Task) {
        let now = Utc::now();
        task.set_closed(true, now);
        assert_eq!(task.finished_date, Some(now));

        task.set_closed(true, now + chrono::Duration::hours(1));
        assert_eq!(task.finished_date, Some(now));

        task.set_closed(false, now);
        assert!(task.finished_date.is_none());
        assert!(!task.is_closed);
    }

    #[rstest]
    #[case(TaskFilter { milestone: Some(MilestoneId::new(6)), ..TaskFilter::default() }, true)]
    #[case(TaskFilter { milestone: Some(MilestoneId::new(7)), ..TaskFilter::default() }, false)]
    #[case(TaskFilter { user_story: Some(UserStoryId::new(5)), ..TaskFilter::default() }, true)]
    #[case(TaskFilter { q: Some("login".to_owned()), ..TaskFilter::default() }, true)]
    #[case(TaskFilter { q: Some("12".to_owned()), ..TaskFilter::default() }, true)]
    #[case(TaskFilter { q: Some("logout".to_owned()), ..TaskFilter::default() }, false)]
    fn filters_match_columns_and_text(task: Task, #[case] filter: TaskFilter, #[case] expected: bool) {
        assert_eq!(filter.matches(&task), expected);
    }

    #[rstest]
    fn snapshots_record_the_planning_links(task: Task) {
        let snapshot = task.snapshot();
        assert_eq!(snapshot["user_story"], 5);
        assert_eq!(snapshot["milestone"], 6);
        assert_eq!(snapshot["is_iocaine"], false);
    }
}
