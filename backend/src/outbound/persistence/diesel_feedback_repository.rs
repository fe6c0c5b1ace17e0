//! PostgreSQL-backed feedback and project template repositories.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{FeedbackRepository, RepositoryError, TemplateRepository};
use crate::domain::{Email, FeedbackEntry, FeedbackId, NewFeedback, ProjectTemplate};

use super::diesel_helpers::{collect_rows, invalid_row, map_diesel_error, map_pool_error};
use super::models::{FeedbackRow, NewFeedbackRow, TemplateRow};
use super::pool::DbPool;
use super::schema::{feedback_entries, project_templates};

/// Diesel-backed implementation of the `FeedbackRepository` port.
#[derive(Clone)]
pub struct DieselFeedbackRepository {
    pool: DbPool,
}

impl DieselFeedbackRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Diesel-backed implementation of the `TemplateRepository` port.
///
/// Only user-created templates live here; built-in ones are added by the
/// service.
#[derive(Clone)]
pub struct DieselTemplateRepository {
    pool: DbPool,
}

impl DieselTemplateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_feedback(row: FeedbackRow) -> Result<FeedbackEntry, RepositoryError> {
    let email = Email::new(&row.email).map_err(|err| invalid_row("feedback_entries", err))?;
    Ok(FeedbackEntry {
        id: FeedbackId::new(row.id),
        full_name: row.full_name,
        email,
        comment: row.comment,
        created_date: row.created_date,
    })
}

fn template_to_row(template: &ProjectTemplate) -> Result<TemplateRow, RepositoryError> {
    let encode = |value: serde_json::Result<serde_json::Value>| {
        value.map_err(|err| RepositoryError::query(format!("template serialisation failed: {err}")))
    };
    Ok(TemplateRow {
        slug: template.slug.clone(),
        name: template.name.clone(),
        description: template.description.clone(),
        created_date: template.created_date,
        default_owner_role: template.default_owner_role.clone(),
        default_us_status: template.default_us_status.clone(),
        default_issue_status: template.default_issue_status.clone(),
        us_statuses: encode(serde_json::to_value(&template.us_statuses))?,
        issue_statuses: encode(serde_json::to_value(&template.issue_statuses))?,
        roles: encode(serde_json::to_value(&template.roles))?,
        default_task_status: template.default_task_status.clone(),
        task_statuses: encode(serde_json::to_value(&template.task_statuses))?,
    })
}

fn row_to_template(row: TemplateRow) -> Result<ProjectTemplate, RepositoryError> {
    let decode = |err: serde_json::Error| invalid_row("project_templates", err);
    Ok(ProjectTemplate {
        slug: row.slug,
        name: row.name,
        description: row.description,
        created_date: row.created_date,
        default_owner_role: row.default_owner_role,
        default_us_status: row.default_us_status,
        default_task_status: row.default_task_status,
        default_issue_status: row.default_issue_status,
        us_statuses: serde_json::from_value(row.us_statuses).map_err(decode)?,
        task_statuses: serde_json::from_value(row.task_statuses).map_err(decode)?,
        issue_statuses: serde_json::from_value(row.issue_statuses).map_err(decode)?,
        roles: serde_json::from_value(row.roles).map_err(decode)?,
    })
}

#[async_trait]
impl FeedbackRepository for DieselFeedbackRepository {
    async fn create(&self, feedback: NewFeedback) -> Result<FeedbackEntry, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewFeedbackRow {
            full_name: &feedback.full_name,
            email: feedback.email.as_str(),
            comment: &feedback.comment,
            created_date: feedback.created_date,
        };
        let stored: FeedbackRow = diesel::insert_into(feedback_entries::table)
            .values(&row)
            .returning(FeedbackRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_feedback(stored)
    }
}

#[async_trait]
impl TemplateRepository for DieselTemplateRepository {
    async fn list(&self) -> Result<Vec<ProjectTemplate>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TemplateRow> = project_templates::table
            .select(TemplateRow::as_select())
            .order_by(project_templates::slug)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_template)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectTemplate>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TemplateRow> = project_templates::table
            .find(slug)
            .select(TemplateRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_template).transpose()
    }

    async fn create(&self, template: &ProjectTemplate) -> Result<(), RepositoryError> {
        let row = template_to_row(template)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(project_templates::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn builtin_templates_fit_the_row_shape() {
        for template in ProjectTemplate::builtin() {
            let row = template_to_row(&template).expect("row");

            assert_eq!(row_to_template(row).expect("template"), template);
        }
    }

    #[rstest]
    fn malformed_role_documents_are_query_errors() {
        let mut row = template_to_row(&ProjectTemplate::builtin()[0]).expect("row");
        row.roles = json!({"name": "not a list"});

        let error = row_to_template(row).expect_err("invalid roles");

        assert!(matches!(error, RepositoryError::Query { .. }));
    }
}
