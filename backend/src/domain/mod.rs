//! Domain primitives, aggregates and use-case services.
//!
//! Purpose: Define strongly typed domain entities used by the API and
//! persistence layers, the permission algebra that guards them, and one
//! service per resource. Services depend on driven ports only, so adapters
//! can be swapped (PostgreSQL, in-memory) without touching the rules.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - User, Project, Membership, Role, Status, Milestone, UserStory, Task,
//!   Issue: aggregates.
//! - HistoryEntry: frozen snapshot plus diff of a tracked item.
//! - Services: every use-case service wired over one set of adapters.

pub mod error;
mod feedback;
pub mod history;
mod ids;
mod issue;
mod membership;
pub mod milestone;
pub mod occ;
mod password;
pub mod permissions;
pub mod ports;
pub mod project;
pub(crate) mod repositories;
mod slug;
mod status;
pub mod task;
pub mod template;
mod tokens;
pub mod trace_id;
pub mod user;
pub mod user_story;
mod vote;

mod auth_service;
mod feedback_service;
pub mod history_service;
mod issues_service;
mod memberships_service;
mod milestones_service;
mod projects_service;
mod roles_service;
mod services;
mod statuses_service;
mod tasks_service;
pub(crate) mod user_stories_service;
mod users_service;

pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::feedback::{FeedbackContext, FeedbackEntry, NewFeedback};
pub use self::history::{HistoryEntry, HistoryKind, HistoryTarget, HistoryUser};
pub use self::ids::{
    FeedbackId, IssueId, MembershipId, MilestoneId, ProjectId, RoleId, StatusId, TaskId, UserId,
    UserStoryId,
};
pub use self::issue::{Issue, IssueFilter, NewIssue};
pub use self::membership::{Membership, NewMembership, NewRole, Role};
pub use self::milestone::{
    BurndownDay, Milestone, MilestoneFilter, MilestoneStats, NewMilestone,
};
pub use self::password::PasswordHasher;
pub use self::permissions::{ProjectPermission, Requester};
pub use self::project::{
    IssuesStats, MilestoneProgress, NewProject, Project, ProjectStats, StatusCount,
};
pub use self::repositories::Repositories;
pub use self::slug::{slug_candidates, slugify};
pub use self::status::{NewStatus, Status, StatusKind};
pub use self::task::{NewTask, Task, TaskFilter};
pub use self::template::ProjectTemplate;
pub use self::tokens::{TokenError, TokenScope, TokenSigner};
pub use self::trace_id::TraceId;
pub use self::user::{Email, NewUser, User, UserValidationError, Username};
pub use self::user_story::{NewUserStory, OrderField, UserStory, UserStoryFilter};
pub use self::vote::VoteTarget;

pub use self::auth_service::{
    AuthService, AuthSettings, AuthenticatedUser, LoginRequest, Registration,
};
pub use self::feedback_service::FeedbackService;
pub use self::history_service::HistoryService;
pub use self::issues_service::{CreateIssue, IssueChanges, IssueView, IssuesService};
pub use self::memberships_service::{
    BulkMembershipEntry, CreateMembership, InvitationView, MembershipChanges, MembershipView,
    MembershipsService,
};
pub use self::milestones_service::{CreateMilestone, MilestoneChanges, MilestonesService};
pub use self::projects_service::{
    CreateProject, CreateTemplate, ProjectChanges, ProjectDetail, ProjectsService,
};
pub use self::roles_service::{CreateRole, RoleChanges, RolesService};
pub use self::services::{ServiceConfig, ServiceDeps, Services};
pub use self::statuses_service::{CreateStatus, StatusChanges, StatusesService};
pub use self::tasks_service::{BulkCreateTasks, CreateTask, TaskChanges, TasksService};
pub use self::user_stories_service::{
    BulkCreateUserStories, CreateUserStory, SUBJECT_MAX, UserStoriesService, UserStoryChanges,
    bulk_subjects,
};
pub use self::users_service::{UserChanges, UsersService};
