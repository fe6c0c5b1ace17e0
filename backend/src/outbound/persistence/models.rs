//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions to domain types live next to
//! the repository that reads them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{memberships, projects, roles, statuses, users};

/// Row read from `users`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub lang: String,
    pub color: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub email_token: Option<String>,
    pub new_email: Option<String>,
    pub recovery_token: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: Option<&'a str>,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Full rewrite of a user; `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserChangeset<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub bio: &'a str,
    pub lang: &'a str,
    pub color: &'a str,
    pub password_hash: Option<&'a str>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub email_token: Option<&'a str>,
    pub new_email: Option<&'a str>,
    pub recovery_token: Option<&'a str>,
}

/// Row read from `projects`. `last_ref` is only touched by `next_reference`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub owner_id: i64,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub is_private: bool,
    pub anon_permissions: Vec<String>,
    pub public_permissions: Vec<String>,
    pub default_us_status_id: Option<i64>,
    pub default_issue_status_id: Option<i64>,
    pub default_task_status_id: Option<i64>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = projects)]
pub(crate) struct NewProjectRow<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub owner_id: i64,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub is_private: bool,
    pub anon_permissions: Vec<String>,
    pub public_permissions: Vec<String>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ProjectChangeset<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub owner_id: i64,
    pub modified_date: DateTime<Utc>,
    pub is_private: bool,
    pub anon_permissions: Vec<String>,
    pub public_permissions: Vec<String>,
    pub default_us_status_id: Option<i64>,
    pub default_issue_status_id: Option<i64>,
    pub default_task_status_id: Option<i64>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoleRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub computable: bool,
    pub permissions: Vec<String>,
}

/// Insert and update payload for `roles`; the project never changes.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = roles)]
pub(crate) struct RoleValues<'a> {
    pub project_id: i64,
    pub name: &'a str,
    pub slug: &'a str,
    pub sort_order: i32,
    pub computable: bool,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: Option<i64>,
    pub role_id: i64,
    pub email: Option<String>,
    pub is_owner: bool,
    pub token: Option<String>,
    pub invited_by_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = memberships)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MembershipValues<'a> {
    pub project_id: i64,
    pub user_id: Option<i64>,
    pub role_id: i64,
    pub email: Option<&'a str>,
    pub is_owner: bool,
    pub token: Option<&'a str>,
    pub invited_by_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StatusRow {
    pub id: i64,
    pub project_id: i64,
    pub kind: String,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub is_closed: bool,
    pub color: String,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = statuses)]
pub(crate) struct StatusValues<'a> {
    pub project_id: i64,
    pub kind: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub sort_order: i32,
    pub is_closed: bool,
    pub color: &'a str,
}

mod work_item_rows;

pub(crate) use work_item_rows::{
    FeedbackRow, HistoryCommentChangeset, HistoryRow, IssueRow, IssueValues, MilestoneRow,
    MilestoneValues, NewFeedbackRow, TaskRow, TaskValues, TemplateRow, UserStoryRow,
    UserStoryValues, VoteRow,
};
