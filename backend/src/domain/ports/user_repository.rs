//! Port for user account persistence.
use async_trait::async_trait;

use crate::domain::{NewUser, User, UserId};

use super::RepositoryError;

/// Storage for user accounts.
///
/// Username and email uniqueness is enforced by the adapter and reported as
/// [`RepositoryError::Duplicate`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account and return it with its identifier.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_recovery_token(&self, token: &str)
    -> Result<Option<User>, RepositoryError>;

    async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, RepositoryError>;

    /// Users with the given identifiers, ordered by id. Unknown ids are skipped.
    async fn list_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;

    /// Every account, ordered by id.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Overwrite a stored account.
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;
}
