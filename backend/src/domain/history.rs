//! Change history for user stories and issues.
//!
//! Every tracked change stores the diff against the entity's previous state.
//! Only every few entries carry a full frozen snapshot; the state between
//! them is rebuilt by replaying the partial diffs onto the last snapshot.
//! Comments ride along with changes and can be hidden and restored later.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user_story::ORDER_FIELDS;
use crate::domain::{Error, IssueId, TaskId, User, UserId, UserStoryId};

/// Entity a history entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryTarget {
    /// Keyed `userstories.userstory:{id}`.
    UserStory(UserStoryId),
    /// Keyed `tasks.task:{id}`.
    Task(TaskId),
    /// Keyed `issues.issue:{id}`.
    Issue(IssueId),
}

impl HistoryTarget {
    /// Storage key, e.g. `userstories.userstory:7`.
    pub fn key(self) -> String {
        match self {
            Self::UserStory(id) => format!("userstories.userstory:{id}"),
            Self::Task(id) => format!("tasks.task:{id}"),
            Self::Issue(id) => format!("issues.issue:{id}"),
        }
    }

    /// Resolve the `{content_type}/{id}` pair used in history URLs.
    pub fn from_path(content_type: &str, id: i64) -> Option<Self> {
        match content_type {
            "userstory" => Some(Self::UserStory(UserStoryId::new(id))),
            "task" => Some(Self::Task(TaskId::new(id))),
            "issue" => Some(Self::Issue(IssueId::new(id))),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// First entry of an item, always a full snapshot.
    Create,
    /// An edit, or a bare comment when the diff is empty.
    Change,
    /// Last entry, written when the item is removed.
    Delete,
}

impl HistoryKind {
    /// Storage name, matching the serde form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }

    /// Inverse of [`HistoryKind::as_str`]; `None` for unknown names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(Self::Create),
            "change" => Some(Self::Change),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Author of an entry, frozen at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryUser {
    #[schema(value_type = Option<i64>)]
    pub pk: Option<UserId>,
    pub name: String,
}

impl HistoryUser {
    /// Author record for `user`.
    pub fn from_user(user: &User) -> Self {
        Self {
            pk: Some(user.id),
            name: user.display_name().to_owned(),
        }
    }
}

/// Field name to `[old, new]`.
pub type Diff = BTreeMap<String, [Value; 2]>;

/// One recorded change.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub key: String,
    pub user: HistoryUser,
    pub created_at: DateTime<Utc>,
    pub kind: HistoryKind,
    pub diff: Diff,
    pub values_diff: Diff,
    pub snapshot: Option<Value>,
    pub comment: String,
    pub delete_comment_date: Option<DateTime<Utc>>,
    pub delete_comment_user: Option<HistoryUser>,
    pub is_hidden: bool,
    pub is_snapshot: bool,
}

impl HistoryEntry {
    /// Hide the comment of this entry.
    ///
    /// # Errors
    /// Returns [`Error::invalid_request`] when the entry has no comment.
    pub fn delete_comment(&mut self, user: HistoryUser, now: DateTime<Utc>) -> Result<(), Error> {
        self.require_comment()?;
        self.delete_comment_date = Some(now);
        self.delete_comment_user = Some(user);
        Ok(())
    }

    /// Restore a hidden comment.
    ///
    /// # Errors
    /// Returns [`Error::invalid_request`] when the entry has no comment.
    pub fn undelete_comment(&mut self) -> Result<(), Error> {
        self.require_comment()?;
        self.delete_comment_date = None;
        self.delete_comment_user = None;
        Ok(())
    }

    fn require_comment(&self) -> Result<(), Error> {
        if self.comment.trim().is_empty() {
            return Err(Error::invalid_request("Comment does not exist"));
        }
        Ok(())
    }

    /// Field names this entry changed.
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.diff.keys().map(String::as_str)
    }
}

/// Per-field differences between two snapshots.
///
/// Missing snapshots count as empty objects, so a creation diffs every field
/// against `null`.
pub fn diff_snapshots(previous: Option<&Value>, current: Option<&Value>) -> Diff {
    let empty = serde_json::Map::new();
    let before = previous.and_then(Value::as_object).unwrap_or(&empty);
    let after = current.and_then(Value::as_object).unwrap_or(&empty);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key).cloned().unwrap_or(Value::Null);
            let new = after.get(key).cloned().unwrap_or(Value::Null);
            (old != new).then(|| (key.clone(), [old, new]))
        })
        .collect()
}

/// An entry is hidden when it only moved the entity on a board.
pub fn is_hidden_change(diff: &Diff, comment: &str) -> bool {
    !diff.is_empty()
        && comment.trim().is_empty()
        && diff.keys().all(|key| ORDER_FIELDS.contains(&key.as_str()))
}

/// Union of fields changed by `entries`.
pub fn changed_fields<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> BTreeSet<String> {
    entries
        .into_iter()
        .flat_map(|entry| entry.changed_fields().map(str::to_owned))
        .collect()
}

/// Partial entries allowed between two full snapshots when not configured.
pub const DEFAULT_MAX_PARTIAL_DIFFS: usize = 60;

/// State the next entry of a key diffs against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastState {
    /// Latest full snapshot with every later diff replayed onto it.
    pub state: Option<Value>,
    /// The next entry must store a full snapshot.
    pub needs_snapshot: bool,
}

/// Rebuild the current state of a key from its entries, oldest first.
///
/// A full snapshot is due when the key has none yet or when
/// `max_partial_diffs` partial entries already follow the last one.
pub fn last_state(entries: &[HistoryEntry], max_partial_diffs: usize) -> LastState {
    let last_full = entries.iter().enumerate().rev().find_map(|(position, entry)| {
        entry
            .snapshot
            .as_ref()
            .filter(|_| entry.is_snapshot)
            .map(|snapshot| (position, snapshot))
    });
    let Some((position, snapshot)) = last_full else {
        return LastState {
            state: None,
            needs_snapshot: true,
        };
    };
    let partials = &entries[position + 1..];
    let mut state = snapshot.clone();
    if let Value::Object(fields) = &mut state {
        for (field, [_, new]) in partials.iter().flat_map(|entry| entry.diff.iter()) {
            fields.insert(field.clone(), new.clone());
        }
    }
    LastState {
        state: Some(state),
        needs_snapshot: partials.len() >= max_partial_diffs,
    }
}

/// Inputs for a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotInput {
    pub target: HistoryTarget,
    pub kind: HistoryKind,
    pub snapshot: Value,
    pub user: HistoryUser,
    pub comment: String,
    pub now: DateTime<Utc>,
}

/// Build the entry for a snapshot given the key's current state.
///
/// The frozen snapshot is kept only when `previous` says one is due.
/// Returns `None` for a change that neither alters a field nor carries a
/// comment.
pub fn build_entry(previous: &LastState, input: SnapshotInput) -> Option<HistoryEntry> {
    let SnapshotInput {
        target,
        kind,
        snapshot,
        user,
        comment,
        now,
    } = input;
    let diff = match kind {
        HistoryKind::Create | HistoryKind::Change => {
            diff_snapshots(previous.state.as_ref(), Some(&snapshot))
        }
        HistoryKind::Delete => Diff::new(),
    };
    if kind == HistoryKind::Change && diff.is_empty() && comment.trim().is_empty() {
        return None;
    }
    let is_snapshot = previous.needs_snapshot;
    Some(HistoryEntry {
        id: Uuid::new_v4(),
        key: target.key(),
        user,
        created_at: now,
        kind,
        is_hidden: is_hidden_change(&diff, &comment),
        values_diff: diff.clone(),
        diff,
        snapshot: is_snapshot.then_some(snapshot),
        comment: comment.trim().to_owned(),
        delete_comment_date: None,
        delete_comment_user: None,
        is_snapshot,
    })
}

#[cfg(test)]
mod tests;
