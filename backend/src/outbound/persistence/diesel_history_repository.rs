//! PostgreSQL-backed `HistoryRepository` implementation using Diesel ORM.
//!
//! Diffs and the comment-deleting user are stored as JSONB documents.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::history::Diff;
use crate::domain::ports::{HistoryRepository, RepositoryError};
use crate::domain::{HistoryEntry, HistoryKind, HistoryUser, UserId};

use super::diesel_helpers::{collect_rows, invalid_row, map_diesel_error, map_pool_error};
use super::models::{HistoryCommentChangeset, HistoryRow};
use super::pool::DbPool;
use super::schema::history_entries;

/// Diesel-backed implementation of the `HistoryRepository` port.
#[derive(Clone)]
pub struct DieselHistoryRepository {
    pool: DbPool,
}

impl DieselHistoryRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|err| RepositoryError::query(format!("history serialisation failed: {err}")))
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|err| invalid_row("history_entries", err))
}

fn entry_to_row(entry: &HistoryEntry) -> Result<HistoryRow, RepositoryError> {
    Ok(HistoryRow {
        id: entry.id,
        key: entry.key.clone(),
        user_id: entry.user.pk.map(UserId::get),
        user_name: entry.user.name.clone(),
        created_at: entry.created_at,
        kind: entry.kind.as_str().to_owned(),
        diff: to_json(&entry.diff)?,
        values_diff: to_json(&entry.values_diff)?,
        snapshot: entry.snapshot.clone(),
        comment: entry.comment.clone(),
        delete_comment_date: entry.delete_comment_date,
        delete_comment_user: entry.delete_comment_user.as_ref().map(to_json).transpose()?,
        is_hidden: entry.is_hidden,
        is_snapshot: entry.is_snapshot,
    })
}

fn row_to_entry(row: HistoryRow) -> Result<HistoryEntry, RepositoryError> {
    let kind = HistoryKind::parse(&row.kind)
        .ok_or_else(|| invalid_row("history_entries", format!("unknown kind {}", row.kind)))?;
    Ok(HistoryEntry {
        id: row.id,
        key: row.key,
        user: HistoryUser {
            pk: row.user_id.map(UserId::new),
            name: row.user_name,
        },
        created_at: row.created_at,
        kind,
        diff: from_json::<Diff>(row.diff)?,
        values_diff: from_json::<Diff>(row.values_diff)?,
        snapshot: row.snapshot,
        comment: row.comment,
        delete_comment_date: row.delete_comment_date,
        delete_comment_user: row.delete_comment_user.map(from_json).transpose()?,
        is_hidden: row.is_hidden,
        is_snapshot: row.is_snapshot,
    })
}

#[async_trait]
impl HistoryRepository for DieselHistoryRepository {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), RepositoryError> {
        let row = entry_to_row(entry)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(history_entries::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn list(&self, key: &str) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<HistoryRow> = history_entries::table
            .filter(history_entries::key.eq(key))
            .select(HistoryRow::as_select())
            .order((history_entries::created_at.asc(), history_entries::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_entry)
    }

    async fn find(&self, key: &str, id: Uuid) -> Result<Option<HistoryEntry>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<HistoryRow> = history_entries::table
            .filter(history_entries::key.eq(key))
            .filter(history_entries::id.eq(id))
            .select(HistoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_entry).transpose()
    }

    async fn update(&self, entry: &HistoryEntry) -> Result<(), RepositoryError> {
        let changeset = HistoryCommentChangeset {
            delete_comment_date: entry.delete_comment_date,
            delete_comment_user: entry.delete_comment_user.as_ref().map(to_json).transpose()?,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(history_entries::table.find(entry.id))
            .set(&changeset)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!(
                "history entry {}",
                entry.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn entry() -> HistoryEntry {
        let mut diff = Diff::new();
        diff.insert("subject".to_owned(), [json!("Old"), json!("New")]);
        HistoryEntry {
            id: Uuid::new_v4(),
            key: "userstories.userstory:3".to_owned(),
            user: HistoryUser {
                pk: Some(UserId::new(1)),
                name: "Ada".to_owned(),
            },
            created_at: Utc::now(),
            kind: HistoryKind::Change,
            diff: diff.clone(),
            values_diff: diff,
            snapshot: None,
            comment: "renamed".to_owned(),
            delete_comment_date: Some(Utc::now()),
            delete_comment_user: Some(HistoryUser {
                pk: None,
                name: "Grace".to_owned(),
            }),
            is_hidden: false,
            is_snapshot: false,
        }
    }

    #[rstest]
    fn entries_survive_the_row_shape() {
        let original = entry();

        let restored = row_to_entry(entry_to_row(&original).expect("row")).expect("entry");

        assert_eq!(restored, original);
    }

    #[rstest]
    fn malformed_diffs_are_query_errors() {
        let mut row = entry_to_row(&entry()).expect("row");
        row.diff = json!(["not", "an", "object"]);

        let error = row_to_entry(row).expect_err("invalid diff");

        assert!(matches!(error, RepositoryError::Query { .. }));
    }
}
