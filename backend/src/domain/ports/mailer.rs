//! Port for outgoing mail.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Delivery failures raised by mail adapters.
    pub enum MailError {
        /// The transport rejected the message.
        Delivery { message: String } => "mail delivery failed: {message}",
    }
}

/// Message handed to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Stable identifier of the message kind, e.g. `membership_invitation`.
    pub kind: &'static str,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}
