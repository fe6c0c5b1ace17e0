//! Response bodies for domain aggregates.
//!
//! Aggregates stay serialisation-free in the domain. The types here decide
//! which fields reach clients (password hashes and tokens never do) and carry
//! the `ToSchema` derives used by the OpenAPI document.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    FeedbackEntry, HistoryEntry, HistoryKind, HistoryUser, InvitationView, IssueView,
    MembershipView, Milestone, Project, ProjectDetail, ProjectPermission, Role, Status, Task,
    User, UserStory,
};

/// Public user profile.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserBody {
    #[schema(example = 7)]
    pub id: i64,
    #[schema(example = "ada")]
    pub username: String,
    pub full_name: String,
    #[schema(example = "Ada Lovelace")]
    pub full_name_display: String,
    pub email: String,
    pub bio: String,
    pub lang: String,
    pub color: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for UserBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.get(),
            username: user.username.to_string(),
            full_name: user.full_name.clone(),
            full_name_display: user.display_name().to_owned(),
            email: user.email.to_string(),
            bio: user.bio.clone(),
            lang: user.lang.clone(),
            color: user.color.clone(),
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

/// Users as response bodies.
pub fn user_bodies(users: &[User]) -> Vec<UserBody> {
    users.iter().map(UserBody::from).collect()
}

/// User profile plus the bearer token issued on login or registration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthenticatedUserBody {
    #[serde(flatten)]
    pub user: UserBody,
    pub auth_token: String,
}

/// Project fields shared by every project response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectBody {
    pub id: i64,
    pub name: String,
    #[schema(example = "ada-board")]
    pub slug: String,
    pub description: String,
    pub owner: i64,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub is_private: bool,
    pub anon_permissions: Vec<ProjectPermission>,
    pub public_permissions: Vec<ProjectPermission>,
    pub default_us_status: Option<i64>,
    pub default_task_status: Option<i64>,
    pub default_issue_status: Option<i64>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: String,
    pub tags: Vec<String>,
}

impl From<&Project> for ProjectBody {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.get(),
            name: project.name.clone(),
            slug: project.slug.clone(),
            description: project.description.clone(),
            owner: project.owner.get(),
            created_date: project.created_date,
            modified_date: project.modified_date,
            is_private: project.is_private,
            anon_permissions: project.anon_permissions.clone(),
            public_permissions: project.public_permissions.clone(),
            default_us_status: project.default_us_status.map(i64::from),
            default_task_status: project.default_task_status.map(i64::from),
            default_issue_status: project.default_issue_status.map(i64::from),
            total_story_points: project.total_story_points,
            total_milestones: project.total_milestones,
            creation_template: project.creation_template.clone(),
            tags: project.tags.clone(),
        }
    }
}

/// Project as seen by the requester.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectDetailBody {
    #[serde(flatten)]
    pub project: ProjectBody,
    pub my_permissions: Vec<ProjectPermission>,
    pub i_am_owner: bool,
    pub stars: usize,
    pub is_starred: bool,
}

impl From<&ProjectDetail> for ProjectDetailBody {
    fn from(detail: &ProjectDetail) -> Self {
        Self {
            project: ProjectBody::from(&detail.project),
            my_permissions: detail.my_permissions.clone(),
            i_am_owner: detail.i_am_owner,
            stars: detail.stars,
            is_starred: detail.is_starred,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleBody {
    pub id: i64,
    pub project: i64,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub computable: bool,
    pub permissions: Vec<ProjectPermission>,
}

impl From<&Role> for RoleBody {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.get(),
            project: role.project.get(),
            name: role.name.clone(),
            slug: role.slug.clone(),
            order: role.order,
            computable: role.computable,
            permissions: role.permissions.clone(),
        }
    }
}

/// Membership with its role name and, once accepted, its user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MembershipBody {
    pub id: i64,
    pub project: i64,
    pub user: Option<i64>,
    pub full_name: Option<String>,
    pub role: i64,
    pub role_name: String,
    pub email: Option<String>,
    pub is_owner: bool,
    pub is_pending: bool,
    pub invited_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<&MembershipView> for MembershipBody {
    fn from(view: &MembershipView) -> Self {
        let membership = &view.membership;
        Self {
            id: membership.id.get(),
            project: membership.project.get(),
            user: membership.user.map(i64::from),
            full_name: view.user.as_ref().map(|user| user.display_name().to_owned()),
            role: membership.role.get(),
            role_name: view.role_name.clone(),
            email: membership.email.as_ref().map(ToString::to_string),
            is_owner: membership.is_owner,
            is_pending: membership.is_pending(),
            invited_by: membership.invited_by.map(i64::from),
            created_at: membership.created_at,
        }
    }
}

/// Pending invitation looked up by its token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvitationBody {
    pub id: i64,
    pub project: i64,
    pub project_name: String,
    pub project_slug: String,
    pub role: i64,
    pub role_name: String,
    pub email: Option<String>,
    pub token: Option<String>,
    pub invited_by: Option<UserBody>,
    pub created_at: DateTime<Utc>,
}

impl From<&InvitationView> for InvitationBody {
    fn from(view: &InvitationView) -> Self {
        let membership = &view.membership;
        Self {
            id: membership.id.get(),
            project: membership.project.get(),
            project_name: view.project_name.clone(),
            project_slug: view.project_slug.clone(),
            role: membership.role.get(),
            role_name: view.role_name.clone(),
            email: membership.email.as_ref().map(ToString::to_string),
            token: membership.token.clone(),
            invited_by: view.invited_by.as_ref().map(UserBody::from),
            created_at: membership.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusBody {
    pub id: i64,
    pub project: i64,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_closed: bool,
    #[schema(example = "#999999")]
    pub color: String,
}

impl From<&Status> for StatusBody {
    fn from(status: &Status) -> Self {
        Self {
            id: status.id.get(),
            project: status.project.get(),
            name: status.name.clone(),
            slug: status.slug.clone(),
            order: status.order,
            is_closed: status.is_closed,
            color: status.color.clone(),
        }
    }
}

/// Sprint of a project.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MilestoneBody {
    pub id: i64,
    pub project: i64,
    pub owner: Option<i64>,
    #[schema(example = "Sprint 1")]
    pub name: String,
    #[schema(example = "sprint-1")]
    pub slug: String,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub closed: bool,
    pub disponibility: f64,
    pub order: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl From<&Milestone> for MilestoneBody {
    fn from(milestone: &Milestone) -> Self {
        Self {
            id: milestone.id.get(),
            project: milestone.project.get(),
            owner: milestone.owner.map(i64::from),
            name: milestone.name.clone(),
            slug: milestone.slug.clone(),
            estimated_start: milestone.estimated_start,
            estimated_finish: milestone.estimated_finish,
            closed: milestone.closed,
            disponibility: milestone.disponibility,
            order: milestone.order,
            created_date: milestone.created_date,
            modified_date: milestone.modified_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserStoryBody {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: i64,
    pub project: i64,
    pub owner: Option<i64>,
    pub status: Option<i64>,
    pub milestone: Option<i64>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_closed: bool,
    pub backlog_order: i64,
    pub sprint_order: i64,
    pub kanban_order: i64,
    pub version: i32,
    pub generated_from_issue: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finish_date: Option<DateTime<Utc>>,
}

impl From<&UserStory> for UserStoryBody {
    fn from(story: &UserStory) -> Self {
        Self {
            id: story.id.get(),
            reference: story.reference,
            project: story.project.get(),
            owner: story.owner.map(i64::from),
            status: story.status.map(i64::from),
            milestone: story.milestone.map(i64::from),
            subject: story.subject.clone(),
            description: story.description.clone(),
            tags: story.tags.clone(),
            is_archived: story.is_archived,
            is_closed: story.is_closed,
            backlog_order: story.backlog_order,
            sprint_order: story.sprint_order,
            kanban_order: story.kanban_order,
            version: story.version,
            generated_from_issue: story.generated_from_issue.map(i64::from),
            created_date: story.created_date,
            modified_date: story.modified_date,
            finish_date: story.finish_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskBody {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: i64,
    pub project: i64,
    pub owner: Option<i64>,
    pub status: Option<i64>,
    pub user_story: Option<i64>,
    pub milestone: Option<i64>,
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

impl From<&Task> for TaskBody {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.get(),
            reference: task.reference,
            project: task.project.get(),
            owner: task.owner.map(i64::from),
            status: task.status.map(i64::from),
            user_story: task.user_story.map(i64::from),
            milestone: task.milestone.map(i64::from),
            subject: task.subject.clone(),
            description: task.description.clone(),
            tags: task.tags.clone(),
            is_iocaine: task.is_iocaine,
            is_closed: task.is_closed,
            version: task.version,
            created_date: task.created_date,
            modified_date: task.modified_date,
            finished_date: task.finished_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueBody {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: i64,
    pub project: i64,
    pub owner: Option<i64>,
    pub status: Option<i64>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_closed: bool,
    pub version: i32,
    pub votes: usize,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

impl From<&IssueView> for IssueBody {
    fn from(view: &IssueView) -> Self {
        let issue = &view.issue;
        Self {
            id: issue.id.get(),
            reference: issue.reference,
            project: issue.project.get(),
            owner: issue.owner.map(i64::from),
            status: issue.status.map(i64::from),
            subject: issue.subject.clone(),
            description: issue.description.clone(),
            tags: issue.tags.clone(),
            is_closed: issue.is_closed,
            version: issue.version,
            votes: view.votes,
            created_date: issue.created_date,
            modified_date: issue.modified_date,
            finished_date: issue.finished_date,
        }
    }
}

/// One history entry. `diff` maps a field name to `[old, new]`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryBody {
    pub id: Uuid,
    #[schema(example = "userstories.userstory:12")]
    pub key: String,
    pub user: HistoryUser,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    #[schema(value_type = Object)]
    pub diff: BTreeMap<String, [Value; 2]>,
    #[schema(value_type = Object)]
    pub values_diff: BTreeMap<String, [Value; 2]>,
    #[schema(value_type = Option<Object>)]
    pub snapshot: Option<Value>,
    pub comment: String,
    pub delete_comment_date: Option<DateTime<Utc>>,
    pub delete_comment_user: Option<HistoryUser>,
    pub is_hidden: bool,
    pub is_snapshot: bool,
}

impl From<&HistoryEntry> for HistoryEntryBody {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id,
            key: entry.key.clone(),
            user: entry.user.clone(),
            created_at: entry.created_at,
            kind: entry.kind,
            diff: entry.diff.clone(),
            values_diff: entry.values_diff.clone(),
            snapshot: entry.snapshot.clone(),
            comment: entry.comment.clone(),
            delete_comment_date: entry.delete_comment_date,
            delete_comment_user: entry.delete_comment_user.clone(),
            is_hidden: entry.is_hidden,
            is_snapshot: entry.is_snapshot,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackBody {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub comment: String,
    pub created_date: DateTime<Utc>,
}

impl From<&FeedbackEntry> for FeedbackBody {
    fn from(entry: &FeedbackEntry) -> Self {
        Self {
            id: entry.id.get(),
            full_name: entry.full_name.clone(),
            email: entry.email.to_string(),
            comment: entry.comment.clone(),
            created_date: entry.created_date,
        }
    }
}

/// Body of informational responses such as password recovery.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DetailBody {
    #[schema(example = "Mail sended successful!")]
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, UserId, Username};
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn user() -> User {
        User {
            id: UserId::new(7),
            username: Username::new("ada").expect("username"),
            email: Email::new("ada@example.com").expect("email"),
            full_name: String::new(),
            bio: String::new(),
            lang: "en".to_owned(),
            color: "#FC8EAC".to_owned(),
            password_hash: Some("$argon2id$secret".to_owned()),
            is_active: true,
            is_superuser: false,
            date_joined: Utc
                .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
                .single()
                .expect("valid date"),
            email_token: Some("email-token".to_owned()),
            new_email: None,
            recovery_token: Some("recovery-token".to_owned()),
        }
    }

    #[rstest]
    fn user_bodies_never_expose_secrets(user: User) {
        let value = serde_json::to_value(UserBody::from(&user)).expect("serialise user");
        let text = value.to_string();

        assert!(!text.contains("argon2"));
        assert!(!text.contains("recovery-token"));
        assert!(!text.contains("email-token"));
        assert_eq!(value["full_name_display"], "ada");
    }

    #[rstest]
    fn authenticated_users_flatten_the_profile(user: User) {
        let body = AuthenticatedUserBody {
            user: UserBody::from(&user),
            auth_token: "token".to_owned(),
        };

        let value = serde_json::to_value(body).expect("serialise body");

        assert_eq!(value["username"], "ada");
        assert_eq!(value["auth_token"], "token");
    }
}
