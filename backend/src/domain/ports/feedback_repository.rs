//! Ports for feedback entries and project templates.
use async_trait::async_trait;

use crate::domain::{FeedbackEntry, NewFeedback, ProjectTemplate};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, feedback: NewFeedback) -> Result<FeedbackEntry, RepositoryError>;
}

/// Storage for templates captured from projects. Built-in templates are not
/// stored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ProjectTemplate>, RepositoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectTemplate>, RepositoryError>;

    /// Slug collisions are [`RepositoryError::Duplicate`].
    async fn create(&self, template: &ProjectTemplate) -> Result<(), RepositoryError>;
}
