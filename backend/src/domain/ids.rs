//! Integer identifiers for persisted entities.
//!
//! Each entity gets its own newtype so a `ProjectId` cannot be passed where a
//! `UserStoryId` is expected. Identifiers serialise as bare JSON numbers.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database identifier.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Raw identifier value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_id!(
    /// Identifier of a user account.
    UserId
);
define_id!(
    /// Identifier of a project.
    ProjectId
);
define_id!(
    /// Identifier of a project membership or pending invitation.
    MembershipId
);
define_id!(
    /// Identifier of a project role.
    RoleId
);
define_id!(
    /// Identifier of a user-story, task or issue status.
    StatusId
);
define_id!(
    /// Identifier of a milestone (sprint).
    MilestoneId
);
define_id!(
    /// Identifier of a user story.
    UserStoryId
);
define_id!(
    /// Identifier of a task.
    TaskId
);
define_id!(
    /// Identifier of an issue.
    IssueId
);
define_id!(
    /// Identifier of a feedback entry.
    FeedbackId
);
