//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RepositoryError, UserRepository};
use crate::domain::{Email, NewUser, User, UserId, Username};

use super::diesel_helpers::{
    collect_rows, invalid_row, lower, map_diesel_error, map_pool_error, raw_ids,
};
use super::models::{NewUserRow, UserChangeset, UserRow};
use super::pool::DbPool;
use super::schema::users;

type UserFilter = Box<
    dyn BoxableExpression<users::table, diesel::pg::Pg, SqlType = diesel::sql_types::Bool>,
>;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: UserFilter) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(filter)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }
}

/// Convert a database row to a domain user.
pub(crate) fn row_to_user(row: UserRow) -> Result<User, RepositoryError> {
    let username = Username::new(row.username).map_err(|err| invalid_row("users", err))?;
    let email = Email::new(&row.email).map_err(|err| invalid_row("users", err))?;
    let new_email = row
        .new_email
        .as_deref()
        .map(Email::new)
        .transpose()
        .map_err(|err| invalid_row("users", err))?;
    Ok(User {
        id: UserId::new(row.id),
        username,
        email,
        full_name: row.full_name,
        bio: row.bio,
        lang: row.lang,
        color: row.color,
        password_hash: row.password_hash,
        is_active: row.is_active,
        is_superuser: row.is_superuser,
        date_joined: row.date_joined,
        email_token: row.email_token,
        new_email,
        recovery_token: row.recovery_token,
    })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            username: user.username.as_str(),
            email: user.email.as_str(),
            full_name: &user.full_name,
            password_hash: user.password_hash.as_deref(),
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
        };
        let stored: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_user(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.find_one(Box::new(users::id.eq(id.get()))).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one(Box::new(users::username.eq(username.to_owned())))
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.trim().to_lowercase();
        self.find_one(Box::new(lower(users::email).eq(email))).await
    }

    async fn find_by_recovery_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_one(Box::new(users::recovery_token.assume_not_null().eq(token.to_owned())))
            .await
    }

    async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one(Box::new(users::email_token.assume_not_null().eq(token.to_owned())))
            .await
    }

    async fn list_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .filter(users::id.eq_any(raw_ids(ids)))
            .select(UserRow::as_select())
            .order_by(users::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_user)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .order_by(users::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_user)
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = UserChangeset {
            username: user.username.as_str(),
            email: user.email.as_str(),
            full_name: &user.full_name,
            bio: &user.bio,
            lang: &user.lang,
            color: &user.color,
            password_hash: user.password_hash.as_deref(),
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            email_token: user.email_token.as_deref(),
            new_email: user.new_email.as_ref().map(Email::as_str),
            recovery_token: user.recovery_token.as_deref(),
        };
        let updated = diesel::update(users::table.find(user.id.get()))
            .set(&changeset)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!("user {}", user.id)));
        }
        Ok(())
    }
}
