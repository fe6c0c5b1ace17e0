//! Rows for milestones, work items, votes, history, feedback and templates.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::outbound::persistence::schema::{
    feedback_entries, history_entries, issues, milestones, project_templates, tasks, user_stories,
    votes,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserStoryRow {
    pub id: i64,
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_closed: bool,
    pub backlog_order: i64,
    pub sprint_order: i64,
    pub kanban_order: i64,
    pub version: i32,
    pub generated_from_issue_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finish_date: Option<DateTime<Utc>>,
    pub milestone_id: Option<i64>,
}

/// Every writable user story column.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = user_stories)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserStoryValues<'a> {
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub subject: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub is_archived: bool,
    pub is_closed: bool,
    pub backlog_order: i64,
    pub sprint_order: i64,
    pub kanban_order: i64,
    pub version: i32,
    pub generated_from_issue_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finish_date: Option<DateTime<Utc>>,
    pub milestone_id: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = milestones)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MilestoneRow {
    pub id: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub closed: bool,
    pub disponibility: f64,
    pub sort_order: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

/// Every writable milestone column.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = milestones)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MilestoneValues<'a> {
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub name: &'a str,
    pub slug: &'a str,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub closed: bool,
    pub disponibility: f64,
    pub sort_order: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskRow {
    pub id: i64,
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub user_story_id: Option<i64>,
    pub milestone_id: Option<i64>,
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

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct TaskValues<'a> {
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub user_story_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub subject: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub is_iocaine: bool,
    pub is_closed: bool,
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = issues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IssueRow {
    pub id: i64,
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_closed: bool,
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = issues)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct IssueValues<'a> {
    pub reference: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub subject: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub is_closed: bool,
    pub version: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub(crate) struct VoteRow {
    pub kind: &'static str,
    pub object_id: i64,
    pub user_id: i64,
}

/// Read and insert shape of `history_entries`; the diffs are JSON objects.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = history_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HistoryRow {
    pub id: Uuid,
    pub key: String,
    pub user_id: Option<i64>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub kind: String,
    pub diff: Value,
    pub values_diff: Value,
    pub snapshot: Option<Value>,
    pub comment: String,
    pub delete_comment_date: Option<DateTime<Utc>>,
    pub delete_comment_user: Option<Value>,
    pub is_hidden: bool,
    pub is_snapshot: bool,
}

/// The only mutable part of a history entry.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = history_entries)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct HistoryCommentChangeset {
    pub delete_comment_date: Option<DateTime<Utc>>,
    pub delete_comment_user: Option<Value>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = feedback_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FeedbackRow {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub comment: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feedback_entries)]
pub(crate) struct NewFeedbackRow<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub comment: &'a str,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = project_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TemplateRow {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_date: Option<DateTime<Utc>>,
    pub default_owner_role: String,
    pub default_us_status: String,
    pub default_issue_status: String,
    pub us_statuses: Value,
    pub issue_statuses: Value,
    pub roles: Value,
    pub default_task_status: String,
    pub task_statuses: Value,
}
