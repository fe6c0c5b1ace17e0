//! Mail adapter that writes outgoing messages to the log.
//!
//! No SMTP transport is wired yet. Every message is recorded through
//! `tracing` so operators can follow invitations, password recovery and
//! account-cancellation flows from the logs.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{MailError, Mailer, OutgoingMail};

/// Mailer that logs each message and reports success.
#[derive(Debug, Clone, Default)]
pub struct TracingMailer;

impl TracingMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(
            kind = mail.kind,
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "outgoing mail"
        );
        Ok(())
    }
}
