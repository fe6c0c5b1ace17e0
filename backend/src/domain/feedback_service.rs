//! Feedback submission.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::permissions::{PermissionContext, Requester, rules};
use crate::domain::ports::{Mailer, OutgoingMail};
use crate::domain::user_stories_service::authenticated;
use crate::domain::{Email, Error, FeedbackContext, FeedbackEntry, NewFeedback, Repositories};

/// Feedback service. Disabled when no recipient address is configured.
#[derive(Clone)]
pub struct FeedbackService {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    recipient: Option<Email>,
}

impl FeedbackService {
    /// Build the service over the feedback store and mailer.
    pub fn new(
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        recipient: Option<Email>,
    ) -> Self {
        Self {
            repos,
            mailer,
            clock,
            recipient,
        }
    }

    /// Store feedback from the requester and mail it to the operators.
    pub async fn create(
        &self,
        requester: &Requester,
        comment: &str,
        context: &FeedbackContext,
    ) -> Result<FeedbackEntry, Error> {
        rules::feedback().check("create", &PermissionContext::new(requester))?;
        let user = authenticated(requester)?;
        let Some(recipient) = &self.recipient else {
            return Err(Error::invalid_request("Feedback is disabled"));
        };
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(Error::invalid_field(
                "comment",
                "required",
                "This field is required.",
            ));
        }

        let entry = self
            .repos
            .feedback
            .create(NewFeedback {
                full_name: user.display_name().to_owned(),
                email: user.email.clone(),
                comment: comment.to_owned(),
                created_date: self.clock.utc(),
            })
            .await?;

        let headers: String = context
            .entries()
            .into_iter()
            .map(|(label, value)| format!("\n{label}: {value}"))
            .collect();
        let body = format!(
            "{} <{}> wrote:\n\n{}\n{headers}",
            entry.full_name, entry.email, entry.comment
        );
        let mail = OutgoingMail {
            kind: "feedback_notification",
            to: recipient.to_string(),
            subject: format!("Feedback from {}", entry.full_name),
            body,
        };
        if let Err(err) = self.mailer.send(&mail).await {
            tracing::warn!(error = %err, feedback = %entry.id, "feedback mail failed");
        }
        Ok(entry)
    }
}

#[cfg(test)]
#[path = "feedback_service_tests.rs"]
mod tests;
