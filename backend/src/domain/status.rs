//! Workflow statuses for user stories, tasks and issues.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ProjectId, StatusId};

/// Which kind of item a status applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Columns of the backlog and kanban boards.
    UserStory,
    /// Columns of the sprint taskboard.
    Task,
    /// Issue workflow.
    Issue,
}

impl StatusKind {
    /// Every kind, in the order project templates create them.
    pub const ALL: [Self; 3] = [Self::UserStory, Self::Task, Self::Issue];

    /// Storage name, as kept in the `statuses.kind` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserStory => "user_story",
            Self::Task => "task",
            Self::Issue => "issue",
        }
    }

    /// Parse the storage name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user_story" => Some(Self::UserStory),
            "task" => Some(Self::Task),
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatus {
    pub project: ProjectId,
    pub kind: StatusKind,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_closed: bool,
    pub color: String,
}

/// Column of a project's board. `(project, kind, slug)` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: StatusId,
    pub project: ProjectId,
    pub kind: StatusKind,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_closed: bool,
    pub color: String,
}

impl Status {
    /// Attach the storage identifier to a new status.
    pub fn from_new(id: StatusId, new_status: NewStatus) -> Self {
        let NewStatus {
            project,
            kind,
            name,
            slug,
            order,
            is_closed,
            color,
        } = new_status;
        Self {
            id,
            project,
            kind,
            name,
            slug,
            order,
            is_closed,
            color,
        }
    }
}
