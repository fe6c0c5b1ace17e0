//! Votes: stars on projects and upvotes on issues.

use crate::domain::{IssueId, ProjectId};

/// Object a vote is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    /// A star.
    Project(ProjectId),
    /// An issue vote.
    Issue(IssueId),
}

impl VoteTarget {
    /// Storage discriminator.
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Issue(_) => "issue",
        }
    }

    /// Id of the voted object.
    pub const fn object_id(self) -> i64 {
        match self {
            Self::Project(id) => id.get(),
            Self::Issue(id) => id.get(),
        }
    }
}
