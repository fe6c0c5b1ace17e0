//! Feedback sent by users to the service operators.

use chrono::{DateTime, Utc};

use crate::domain::{Email, FeedbackId};

/// Feedback before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub full_name: String,
    pub email: Email,
    pub comment: String,
    pub created_date: DateTime<Utc>,
}

/// Stored feedback entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEntry {
    pub id: FeedbackId,
    pub full_name: String,
    pub email: Email,
    pub comment: String,
    pub created_date: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Attach a store-assigned id to an unsaved entry.
    pub fn from_new(id: FeedbackId, new_feedback: NewFeedback) -> Self {
        Self {
            id,
            full_name: new_feedback.full_name,
            email: new_feedback.email,
            comment: new_feedback.comment,
            created_date: new_feedback.created_date,
        }
    }
}

/// Request headers forwarded with feedback mail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackContext {
    pub host: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

impl FeedbackContext {
    /// Non-empty `(label, value)` pairs for the mail body.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("HTTP_HOST", self.host.as_deref()),
            ("HTTP_REFERER", self.referer.as_deref()),
            ("HTTP_USER_AGENT", self.user_agent.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|value| (label, value)))
        .collect()
    }
}
