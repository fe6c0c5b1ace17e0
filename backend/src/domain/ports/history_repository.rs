//! Port for change history.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::HistoryEntry;

use super::RepositoryError;

/// Append-mostly storage for history entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), RepositoryError>;

    /// Entries for `key`, oldest first.
    async fn list(&self, key: &str) -> Result<Vec<HistoryEntry>, RepositoryError>;

    async fn find(&self, key: &str, id: Uuid) -> Result<Option<HistoryEntry>, RepositoryError>;

    /// Overwrite the comment moderation fields of an entry.
    async fn update(&self, entry: &HistoryEntry) -> Result<(), RepositoryError>;
}
