//! PostgreSQL-backed `VoteRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RepositoryError, VoteRepository};
use crate::domain::{ProjectId, UserId, VoteTarget};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::VoteRow;
use super::pool::DbPool;
use super::schema::votes;

const PROJECT_VOTE_KIND: &str = VoteTarget::Project(ProjectId::new(0)).kind();

/// Diesel-backed implementation of the `VoteRepository` port.
#[derive(Clone)]
pub struct DieselVoteRepository {
    pool: DbPool,
}

impl DieselVoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteRepository for DieselVoteRepository {
    async fn add(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = VoteRow {
            kind: target.kind(),
            object_id: target.object_id(),
            user_id: user.get(),
        };
        let inserted = diesel::insert_into(votes::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted == 1)
    }

    async fn remove(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(votes::table.find((
            target.kind(),
            target.object_id(),
            user.get(),
        )))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted == 1)
    }

    async fn voters(&self, target: VoteTarget) -> Result<Vec<UserId>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<i64> = votes::table
            .filter(votes::kind.eq(target.kind()))
            .filter(votes::object_id.eq(target.object_id()))
            .select(votes::user_id)
            .order_by(votes::user_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn count(&self, target: VoteTarget) -> Result<usize, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = votes::table
            .filter(votes::kind.eq(target.kind()))
            .filter(votes::object_id.eq(target.object_id()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        usize::try_from(total).map_err(|_| RepositoryError::query("negative vote count"))
    }

    async fn starred_projects(&self, user: UserId) -> Result<Vec<ProjectId>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<i64> = votes::table
            .filter(votes::kind.eq(PROJECT_VOTE_KIND))
            .filter(votes::user_id.eq(user.get()))
            .select(votes::object_id)
            .order_by(votes::object_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(ProjectId::new).collect())
    }
}
