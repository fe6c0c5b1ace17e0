//! Issues: bugs and questions raised against a project.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::domain::user_story::matches_text;
use crate::domain::{IssueId, ProjectId, StatusId, UserId};

/// Issue data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_closed: bool,
    pub created_date: DateTime<Utc>,
}

/// A stored issue. Shares the reference sequence and version rules of
/// [`crate::domain::UserStory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: IssueId,
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_closed: bool,
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

impl Issue {
    /// Attach a store-assigned id to an unsaved issue.
    pub fn from_new(id: IssueId, new_issue: NewIssue) -> Self {
        let NewIssue {
            reference,
            project,
            owner,
            status,
            subject,
            description,
            tags,
            is_closed,
            created_date,
        } = new_issue;
        Self {
            id,
            reference,
            project,
            owner,
            status,
            subject,
            description,
            tags,
            is_closed,
            version: 1,
            created_date,
            modified_date: created_date,
            finished_date: is_closed.then_some(created_date),
        }
    }

    /// Set `is_closed` and stamp or clear `finished_date`.
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
            "subject": self.subject,
            "description": self.description,
            "tags": self.tags,
            "is_closed": self.is_closed,
            "finished_date": self.finished_date,
        })
    }
}

/// Filters accepted by the issue listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub project: Option<ProjectId>,
    pub status: Option<StatusId>,
    pub q: Option<String>,
}

impl IssueFilter {
    /// Check the column filters only.
    ///
    /// Adapters that push these filters into SQL still run `q` in memory.
    pub fn matches_columns(&self, issue: &Issue) -> bool {
        self.project.is_none_or(|project| issue.project == project)
            && self.status.is_none_or(|status| issue.status == Some(status))
    }

    /// Check every filter, including the free-text `q`.
    pub fn matches(&self, issue: &Issue) -> bool {
        self.matches_columns(issue)
            && self
                .q
                .as_deref()
                .is_none_or(|q| matches_text(issue.reference, &issue.subject, q))
    }
}
