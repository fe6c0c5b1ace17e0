//! User stories: backlog items ordered on three boards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::domain::{IssueId, MilestoneId, ProjectId, StatusId, UserId, UserStoryId};

/// Board ordering a bulk reorder updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    /// `backlog_order`, the product backlog.
    Backlog,
    /// `sprint_order`, within a milestone.
    Sprint,
    /// `kanban_order`, within a status column.
    Kanban,
}

impl OrderField {
    /// Column and snapshot field name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog_order",
            Self::Sprint => "sprint_order",
            Self::Kanban => "kanban_order",
        }
    }
}

/// Snapshot fields that only record board positions.
pub const ORDER_FIELDS: [&str; 3] = ["backlog_order", "sprint_order", "kanban_order"];

/// User story data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserStory {
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub milestone: Option<MilestoneId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_closed: bool,
    pub backlog_order: i64,
    pub sprint_order: i64,
    pub kanban_order: i64,
    pub generated_from_issue: Option<IssueId>,
    pub created_date: DateTime<Utc>,
}

/// A stored user story.
///
/// ## Invariants
/// - `reference` is unique per project and shared with issues.
/// - `is_closed` mirrors the status; `finish_date` is set exactly while closed.
/// - `version` starts at 1 and grows by one per accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStory {
    pub id: UserStoryId,
    pub reference: i64,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub status: Option<StatusId>,
    pub milestone: Option<MilestoneId>,
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_closed: bool,
    pub backlog_order: i64,
    pub sprint_order: i64,
    pub kanban_order: i64,
    pub version: i32,
    pub generated_from_issue: Option<IssueId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub finish_date: Option<DateTime<Utc>>,
}

impl UserStory {
    /// Attach the storage identifier to a new story at version 1.
    pub fn from_new(id: UserStoryId, new_story: NewUserStory) -> Self {
        let NewUserStory {
            reference,
            project,
            owner,
            status,
            milestone,
            subject,
            description,
            tags,
            is_archived,
            is_closed,
            backlog_order,
            sprint_order,
            kanban_order,
            generated_from_issue,
            created_date,
        } = new_story;
        Self {
            id,
            reference,
            project,
            owner,
            status,
            milestone,
            subject,
            description,
            tags,
            is_archived,
            is_closed,
            backlog_order,
            sprint_order,
            kanban_order,
            version: 1,
            generated_from_issue,
            created_date,
            modified_date: created_date,
            finish_date: is_closed.then_some(created_date),
        }
    }

    /// Follow the closed flag of the story's status.
    pub fn set_closed(&mut self, is_closed: bool, now: DateTime<Utc>) {
        if is_closed && !self.is_closed {
            self.finish_date = Some(now);
        } else if !is_closed {
            self.finish_date = None;
        }
        self.is_closed = is_closed;
    }

    /// Position on the board named by `field`.
    pub fn order(&self, field: OrderField) -> i64 {
        match field {
            OrderField::Backlog => self.backlog_order,
            OrderField::Sprint => self.sprint_order,
            OrderField::Kanban => self.kanban_order,
        }
    }

    /// Overwrite one of the three order columns.
    pub fn set_order(&mut self, field: OrderField, value: i64) {
        match field {
            OrderField::Backlog => self.backlog_order = value,
            OrderField::Sprint => self.sprint_order = value,
            OrderField::Kanban => self.kanban_order = value,
        }
    }

    /// Frozen view recorded in history.
    pub fn snapshot(&self) -> Value {
        json!({
            "ref": self.reference,
            "owner": self.owner,
            "status": self.status,
            "milestone": self.milestone,
            "subject": self.subject,
            "description": self.description,
            "tags": self.tags,
            "is_archived": self.is_archived,
            "is_closed": self.is_closed,
            "backlog_order": self.backlog_order,
            "sprint_order": self.sprint_order,
            "kanban_order": self.kanban_order,
            "finish_date": self.finish_date,
        })
    }
}

/// Free-text match: digits match the reference, words must all appear in
/// the subject ignoring case.
pub fn matches_text(reference: i64, subject: &str, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    if query.chars().all(|c| c.is_ascii_digit()) {
        return query.parse::<i64>().is_ok_and(|wanted| wanted == reference);
    }
    let subject = subject.to_lowercase();
    query
        .split_whitespace()
        .all(|word| subject.contains(&word.to_lowercase()))
}

/// Filters accepted by the user story listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStoryFilter {
    pub project: Option<ProjectId>,
    pub status: Option<StatusId>,
    pub milestone: Option<MilestoneId>,
    /// `true` keeps only stories outside any milestone (the backlog).
    pub milestone_is_null: Option<bool>,
    pub is_archived: Option<bool>,
    pub subject: Option<String>,
    pub q: Option<String>,
}

impl UserStoryFilter {
    /// Filters adapters can push into storage.
    pub fn matches_columns(&self, story: &UserStory) -> bool {
        self.project.is_none_or(|project| story.project == project)
            && self.status.is_none_or(|status| story.status == Some(status))
            && self
                .milestone
                .is_none_or(|milestone| story.milestone == Some(milestone))
            && self
                .milestone_is_null
                .is_none_or(|is_null| story.milestone.is_none() == is_null)
            && self
                .is_archived
                .is_none_or(|archived| story.is_archived == archived)
    }

    /// Text filters evaluated in memory.
    pub fn matches_text(&self, story: &UserStory) -> bool {
        let subject_ok = self.subject.as_deref().is_none_or(|subject| {
            story
                .subject
                .to_lowercase()
                .contains(&subject.trim().to_lowercase())
        });
        subject_ok
            && self
                .q
                .as_deref()
                .is_none_or(|q| matches_text(story.reference, &story.subject, q))
    }

    pub fn matches(&self, story: &UserStory) -> bool {
        self.matches_columns(story) && self.matches_text(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn story() -> UserStory {
        UserStory::from_new(
            UserStoryId::new(1),
            NewUserStory {
                reference: 12,
                project: ProjectId::new(1),
                owner: Some(UserId::new(1)),
                status: Some(StatusId::new(3)),
                milestone: None,
                subject: "Export the Weekly report".to_owned(),
                description: String::new(),
                tags: Vec::new(),
                is_archived: false,
                is_closed: false,
                backlog_order: 1,
                sprint_order: 1,
                kanban_order: 1,
                generated_from_issue: None,
                created_date: Utc::now(),
            },
        )
    }

    #[rstest]
    #[case("12", true)]
    #[case("13", false)]
    #[case("weekly EXPORT", true)]
    #[case("weekly import", false)]
    #[case("  ", true)]
    fn text_query_matches_reference_or_words(
        story: UserStory,
        #[case] query: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches_text(story.reference, &story.subject, query), expected);
    }

    #[rstest]
    fn closing_sets_and_reopening_clears_finish_date(mut story: UserStory) {
        let now = Utc::now();
        story.set_closed(true, now);
        assert_eq!(story.finish_date, Some(now));
        story.set_closed(false, now);
        assert!(story.finish_date.is_none());
        assert!(!story.is_closed);
    }

    #[rstest]
    fn filter_combines_columns_and_text(story: UserStory) {
        let filter = UserStoryFilter {
            project: Some(ProjectId::new(1)),
            is_archived: Some(false),
            q: Some("report".to_owned()),
            ..UserStoryFilter::default()
        };
        assert!(filter.matches(&story));

        let other_status = UserStoryFilter {
            status: Some(StatusId::new(9)),
            ..UserStoryFilter::default()
        };
        assert!(!other_status.matches(&story));
    }

    #[rstest]
    fn backlog_filter_keeps_stories_outside_milestones(mut story: UserStory) {
        let backlog = UserStoryFilter {
            milestone_is_null: Some(true),
            ..UserStoryFilter::default()
        };
        assert!(backlog.matches(&story));

        story.milestone = Some(MilestoneId::new(4));
        assert!(!backlog.matches(&story));
        let sprint = UserStoryFilter {
            milestone: Some(MilestoneId::new(4)),
            ..UserStoryFilter::default()
        };
        assert!(sprint.matches(&story));
    }

    #[rstest]
    fn set_order_touches_only_the_named_field(mut story: UserStory) {
        story.set_order(OrderField::Kanban, 40);
        assert_eq!(story.kanban_order, 40);
        assert_eq!(story.backlog_order, 1);
        assert_eq!(story.order(OrderField::Kanban), 40);
    }
}
